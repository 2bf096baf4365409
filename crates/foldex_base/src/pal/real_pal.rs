use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::{FoldexError, FoldexResult};

use super::FilePath;
use super::traits::{
    DirEntry, EntryKind, FileChangeCallback, FileChangeEvent, Pal, ReadSeek, WatchRegistration,
    not_a_folder,
};

/* 📖 # Why does RealPal hide excluded directories?

The settings file lives inside the store root (in `.foldex/`), the way an editor keeps
its configuration folder inside a vault. That folder is not part of the document
hierarchy: it never shows up in listings and changes below it are not reported,
so writing settings cannot trigger index rebuilds or appear in the root index.
*/

/// PAL implementation backed by the real filesystem, rooted at a base directory.
pub struct RealPal {
    base_dir: PathBuf,
    excluded: Vec<String>,
}

impl std::fmt::Debug for RealPal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealPal")
            .field("base_dir", &self.base_dir)
            .field("excluded", &self.excluded)
            .finish_non_exhaustive()
    }
}

impl RealPal {
    /// Create a new RealPal with the given base directory.
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            excluded: Vec::new(),
        }
    }

    /// Hide every directory with this bare name from listings and change notifications.
    pub fn with_excluded_directory(mut self, name: impl Into<String>) -> Self {
        self.excluded.push(name.into());
        self
    }

    /// Resolve a FilePath to an absolute filesystem path.
    fn resolve_path(&self, path: &FilePath) -> PathBuf {
        self.base_dir.join(path.as_path())
    }

    fn is_excluded(&self, path: &FilePath) -> bool {
        is_excluded(path, &self.excluded)
    }
}

fn is_excluded(path: &FilePath, excluded: &[String]) -> bool {
    path.as_str()
        .split('/')
        .any(|segment| excluded.iter().any(|name| name == segment))
}

impl Pal for RealPal {
    #[instrument(skip(self), fields(path = %path))]
    fn file_exists(&self, path: &FilePath) -> FoldexResult<bool> {
        let resolved = self.resolve_path(path);
        let exists = resolved.exists();
        debug!(exists, resolved = %resolved.display(), "checked file existence");
        Ok(exists)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn entry_kind(&self, path: &FilePath) -> FoldexResult<Option<EntryKind>> {
        if self.is_excluded(path) {
            return Ok(None);
        }
        let resolved = self.resolve_path(path);
        match fs::metadata(&resolved) {
            Ok(metadata) if metadata.is_dir() => Ok(Some(EntryKind::Folder)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                debug!(error = %e, "failed to read metadata");
                Err(FoldexError::file_error(resolved, e))
            }
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    fn list_directory(&self, path: &FilePath) -> FoldexResult<Vec<DirEntry>> {
        let resolved = self.resolve_path(path);
        if !resolved.is_dir() || self.is_excluded(path) {
            debug!("not a directory");
            return Err(not_a_folder(path));
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&resolved)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                debug!(error = %e, "error listing directory");
                FoldexError::file_error(
                    e.path().map(Path::to_path_buf).unwrap_or_else(|| resolved.clone()),
                    std::io::Error::other(e.to_string()),
                )
            })?;
            let name = entry.file_name().to_string_lossy();
            if self.excluded.iter().any(|excluded| *excluded == name) {
                continue;
            }
            let kind = if entry.file_type().is_dir() {
                EntryKind::Folder
            } else {
                EntryKind::File
            };
            entries.push(DirEntry::new(path.join(&name), kind));
        }
        debug!(count = entries.len(), "listed directory");
        Ok(entries)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn read_file(&self, path: &FilePath) -> FoldexResult<Box<dyn ReadSeek + 'static>> {
        let resolved = self.resolve_path(path);
        let file = fs::File::open(&resolved).map_err(|e| {
            debug!(error = %e, "failed to open file");
            FoldexError::file_error(resolved, e)
        })?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn create_file(&self, path: &FilePath) -> FoldexResult<Box<dyn Write>> {
        let resolved = self.resolve_path(path);
        debug!(resolved = %resolved.display(), "creating file");
        let file = fs::File::create(&resolved).map_err(|e| {
            debug!(error = %e, "failed to create file");
            FoldexError::file_error(resolved, e)
        })?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn remove_file(&self, path: &FilePath) -> FoldexResult<()> {
        let resolved = self.resolve_path(path);
        fs::remove_file(&resolved).map_err(|e| {
            debug!(error = %e, "failed to remove file");
            FoldexError::file_error(resolved, e)
        })
    }

    #[instrument(skip(self), fields(path = %path))]
    fn create_directory_all(&self, path: &FilePath) -> FoldexResult<()> {
        let resolved = self.resolve_path(path);
        fs::create_dir_all(&resolved).map_err(|e| {
            debug!(error = %e, "failed to create directory");
            FoldexError::file_error(resolved, e)
        })
    }

    #[instrument(skip(self, callback), fields(directory = %directory))]
    fn watch_directory(
        &self,
        directory: &FilePath,
        callback: FileChangeCallback,
    ) -> FoldexResult<WatchRegistration> {
        let resolved = self.resolve_path(directory);
        if !resolved.is_dir() {
            debug!("directory not found");
            return Err(not_a_folder(directory));
        }

        // Backends differ in whether they report canonical or joined paths.
        let mut roots = vec![self.base_dir.clone()];
        if let Ok(canonical) = self.base_dir.canonicalize() {
            roots.push(canonical);
        }
        let excluded = self.excluded.clone();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    for change in convert_event(&event, &roots, &excluded) {
                        callback(change);
                    }
                }
                Err(e) => warn!(error = %e, "watch error"),
            }
        })
        .map_err(|e| crate::err!("Failed to create watcher: {}", e))?;
        watcher
            .watch(&resolved, RecursiveMode::Recursive)
            .map_err(|e| crate::err!("Failed to watch '{}': {}", resolved.display(), e))?;

        debug!(resolved = %resolved.display(), "watching directory");
        Ok(WatchRegistration::new(move || {
            debug!(resolved = %resolved.display(), "stopped watching directory");
            drop(watcher);
        }))
    }
}

/// Map an absolute path reported by the watcher back into the store.
fn to_file_path(path: &Path, roots: &[PathBuf], excluded: &[String]) -> Option<FilePath> {
    let relative = roots.iter().find_map(|root| path.strip_prefix(root).ok())?;
    let file_path = FilePath::from(relative);
    if file_path.is_root() || is_excluded(&file_path, excluded) {
        return None;
    }
    Some(file_path)
}

/// Translate a native notification into store change events.
///
/// Content and metadata modifications are dropped: they never change a folder listing.
fn convert_event(event: &Event, roots: &[PathBuf], excluded: &[String]) -> Vec<FileChangeEvent> {
    let map = |path: &PathBuf| to_file_path(path, roots, excluded);
    match &event.kind {
        EventKind::Create(_) => event
            .paths
            .iter()
            .filter_map(map)
            .map(|path| FileChangeEvent::Created { path })
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .iter()
            .filter_map(map)
            .map(|path| FileChangeEvent::Deleted { path })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() >= 2 => {
            match (map(&event.paths[0]), map(&event.paths[1])) {
                (Some(from), Some(to)) => vec![FileChangeEvent::Renamed { from, to }],
                (Some(path), None) => vec![FileChangeEvent::Deleted { path }],
                (None, Some(path)) => vec![FileChangeEvent::Created { path }],
                (None, None) => Vec::new(),
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .iter()
            .filter_map(map)
            .map(|path| FileChangeEvent::Deleted { path })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .iter()
            .filter_map(map)
            .map(|path| FileChangeEvent::Created { path })
            .collect(),
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .filter_map(|absolute| {
                let path = map(absolute)?;
                Some(if absolute.exists() {
                    FileChangeEvent::Created { path }
                } else {
                    FileChangeEvent::Deleted { path }
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}
