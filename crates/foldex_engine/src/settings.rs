/* 📖 # Why is IndexSettings held by a SettingsHandle instead of a global?

Rebuilds read the settings at the moment they execute, while the configuration
surface changes them at any time. SettingsHandle is the single owner: it hands out
snapshots, and every mutation goes through it so that the old index file name is
captured as `previous_index_file_name` and persisted before the new name becomes
visible to any rebuild.
*/

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use foldex_base::{ErrorKind, FilePath, FoldexError, FoldexResult, PalHandle, ResultExt};

/// File name used for generated index documents unless configured otherwise.
pub const DEFAULT_INDEX_FILE_NAME: &str = "Index.md";

/// Ignore patterns applied unless configured otherwise: sync tool temp files and conflict copies.
pub const DEFAULT_IGNORED_PATTERNS: &str = r"^\.syncthing,\(conflicted copy\)";

/// Directory below the store root that holds foldex's own state.
pub const SETTINGS_DIRECTORY: &str = ".foldex";

/// Default location of the settings file, relative to the store root.
pub const DEFAULT_SETTINGS_PATH: &str = ".foldex/settings.toml";

/// Configuration for index generation.
///
/// Every field has a default, so a settings file containing only some keys is merged
/// over [`IndexSettings::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// File name of the index document generated in every folder.
    pub index_file_name: String,
    /// Index file name in effect before the last change, used to remove stale index files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_index_file_name: Option<String>,
    /// Comma-separated regular expressions matched against bare child names.
    pub ignored_patterns: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            index_file_name: DEFAULT_INDEX_FILE_NAME.to_string(),
            previous_index_file_name: None,
            ignored_patterns: DEFAULT_IGNORED_PATTERNS.to_string(),
        }
    }
}

/// A committed change of the index file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFileNameChange {
    pub previous: String,
    pub current: String,
}

fn settings_error(message: impl Into<String>) -> Box<FoldexError> {
    Box::new(FoldexError::new(ErrorKind::Settings {
        message: message.into(),
    }))
}

/// Load settings from `path`, falling back to defaults when the file does not exist.
#[instrument(skip(pal), fields(path = %path))]
pub fn load_settings(pal: &PalHandle, path: &FilePath) -> FoldexResult<IndexSettings> {
    if !pal.file_exists(path)? {
        debug!("no settings file, using defaults");
        return Ok(IndexSettings::default());
    }
    let text = pal
        .read_file_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path))?;
    let mut settings: IndexSettings = toml::from_str(&text).map_err(|e| {
        Box::new(
            FoldexError::new(ErrorKind::Settings {
                message: format!("cannot parse {}", path),
            })
            .caused_by(FoldexError::message(e.message())),
        )
    })?;
    if settings.index_file_name.trim().is_empty() {
        warn!("empty index file name in settings, using default");
        settings.index_file_name = DEFAULT_INDEX_FILE_NAME.to_string();
    }
    Ok(settings)
}

/// Persist settings to `path`, creating its folder if necessary.
#[instrument(skip(pal, settings), fields(path = %path))]
pub fn save_settings(pal: &PalHandle, path: &FilePath, settings: &IndexSettings) -> FoldexResult<()> {
    let text = toml::to_string_pretty(settings).map_err(|e| settings_error(e.to_string()))?;
    if let Some(parent) = path.parent()
        && !parent.is_root()
    {
        pal.create_directory_all(&parent)?;
    }
    pal.write_file(path, &text)
        .with_context(|| format!("Failed to write settings to {}", path))
}

/// Shared owner of the current settings and their persisted location.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    pal: PalHandle,
    path: FilePath,
    settings: Arc<RwLock<IndexSettings>>,
}

impl SettingsHandle {
    /// Wrap already loaded settings that persist to `path`.
    pub fn new(pal: PalHandle, path: FilePath, settings: IndexSettings) -> Self {
        Self {
            pal,
            path,
            settings: Arc::new(RwLock::new(settings)),
        }
    }

    /// Load settings from `path` (defaults if absent).
    pub fn load(pal: PalHandle, path: FilePath) -> FoldexResult<Self> {
        let settings = load_settings(&pal, &path)?;
        Ok(Self::new(pal, path, settings))
    }

    /// Snapshot of the current settings.
    pub fn get(&self) -> IndexSettings {
        self.settings.read().clone()
    }

    pub fn path(&self) -> &FilePath {
        &self.path
    }

    /// Change the index file name.
    ///
    /// Surrounding whitespace is trimmed and a blank name keeps the current one. Returns
    /// the committed change, or `None` when the name is unchanged.
    pub fn set_index_file_name(&self, new_name: &str) -> FoldexResult<Option<IndexFileNameChange>> {
        let mut settings = self.settings.write();
        let trimmed = new_name.trim();
        if trimmed.is_empty() || trimmed == settings.index_file_name {
            debug!(name = %settings.index_file_name, "index file name unchanged");
            return Ok(None);
        }
        if trimmed.contains(['/', '\\']) {
            return Err(settings_error(format!(
                "index file name '{}' must not contain path separators",
                trimmed
            )));
        }

        let mut updated = settings.clone();
        updated.previous_index_file_name = Some(updated.index_file_name.clone());
        updated.index_file_name = trimmed.to_string();
        save_settings(&self.pal, &self.path, &updated)?;

        let change = IndexFileNameChange {
            previous: settings.index_file_name.clone(),
            current: updated.index_file_name.clone(),
        };
        *settings = updated;
        info!(previous = %change.previous, current = %change.current, "index file name changed");
        Ok(Some(change))
    }

    /// Replace the ignore pattern list verbatim. Takes effect on the next rebuild.
    pub fn set_ignored_patterns(&self, raw: &str) -> FoldexResult<()> {
        let mut settings = self.settings.write();
        let mut updated = settings.clone();
        updated.ignored_patterns = raw.to_string();
        save_settings(&self.pal, &self.path, &updated)?;
        *settings = updated;
        info!(patterns = %raw, "ignored patterns changed");
        Ok(())
    }

    /// Forget `previous` once every stale index named after it has been cleaned up.
    ///
    /// Does nothing if another rename happened in the meantime.
    pub fn clear_previous_index_file_name(&self, previous: &str) -> FoldexResult<()> {
        let mut settings = self.settings.write();
        if settings.previous_index_file_name.as_deref() != Some(previous) {
            return Ok(());
        }
        let mut updated = settings.clone();
        updated.previous_index_file_name = None;
        save_settings(&self.pal, &self.path, &updated)?;
        *settings = updated;
        debug!(previous = %previous, "stale index cleanup complete");
        Ok(())
    }
}
