/* 📖 # Why does update_index return an outcome instead of a Result?

A rebuild is background maintenance. Folders disappear between a change
notification and its handling, and a store write can fail for one folder while
the rest of the tree is fine. update_index therefore never propagates an error:
every failure ends at this boundary, is logged with the folder and cause, and is
reported as an IndexOutcome value that batch callers collect.
*/

use tracing::{debug, info, instrument, warn};

use foldex_base::{EntryKind, FilePath, FoldexError, FoldexResult, PalHandle, ResultExt};

use crate::builder::build_index_content;
use crate::folder::FolderSnapshot;
use crate::settings::IndexSettings;

/// Why a rebuild did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
    NotAFolder,
}

/// Result of rebuilding the index of a single folder.
#[derive(Debug)]
pub enum IndexOutcome {
    Written {
        folder: FilePath,
        index_path: FilePath,
        /// An index under the previous file name was found and removed.
        removed_stale: bool,
    },
    Skipped {
        folder: FilePath,
        reason: SkipReason,
    },
    Failed {
        folder: FilePath,
        error: Box<FoldexError>,
    },
}

impl IndexOutcome {
    pub fn folder(&self) -> &FilePath {
        match self {
            IndexOutcome::Written { folder, .. }
            | IndexOutcome::Skipped { folder, .. }
            | IndexOutcome::Failed { folder, .. } => folder,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, IndexOutcome::Written { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, IndexOutcome::Failed { .. })
    }
}

/// Rebuild the index of `folder` from the current store state.
///
/// When `previous_index_file_name` differs from the configured name, a file with the
/// previous name in `folder` is removed first. A failed removal does not stop the
/// rebuild.
#[instrument(skip(pal, settings), fields(folder = %folder))]
pub fn update_index(
    pal: &PalHandle,
    folder: &FilePath,
    settings: &IndexSettings,
    previous_index_file_name: Option<&str>,
) -> IndexOutcome {
    match try_update_index(pal, folder, settings, previous_index_file_name) {
        Ok(outcome) => outcome,
        Err(error) => {
            warn!(folder = %folder, error = %error, "failed to update index");
            IndexOutcome::Failed {
                folder: folder.clone(),
                error,
            }
        }
    }
}

fn try_update_index(
    pal: &PalHandle,
    folder: &FilePath,
    settings: &IndexSettings,
    previous_index_file_name: Option<&str>,
) -> FoldexResult<IndexOutcome> {
    let skipped = |reason: SkipReason| -> FoldexResult<IndexOutcome> {
        debug!(?reason, "skipped updating index");
        Ok(IndexOutcome::Skipped {
            folder: folder.clone(),
            reason,
        })
    };
    match pal.entry_kind(folder)? {
        Some(EntryKind::Folder) => {}
        Some(EntryKind::File) => return skipped(SkipReason::NotAFolder),
        None => return skipped(SkipReason::NotFound),
    }

    let removed_stale = match previous_index_file_name {
        Some(previous) if !previous.is_empty() && previous != settings.index_file_name => {
            remove_stale_index(pal, &folder.join(previous))
        }
        _ => false,
    };

    // The folder may have vanished while the stale index was removed
    let Some(snapshot) = FolderSnapshot::read(pal, folder)? else {
        return skipped(SkipReason::NotFound);
    };
    let content = build_index_content(&snapshot, settings);
    let index_path = folder.join(&settings.index_file_name);
    pal.write_file(&index_path, &content)
        .with_context(|| format!("Failed to write index '{}'", index_path))?;
    info!(index = %index_path, "updated index");
    Ok(IndexOutcome::Written {
        folder: folder.clone(),
        index_path,
        removed_stale,
    })
}

fn remove_stale_index(pal: &PalHandle, stale: &FilePath) -> bool {
    match pal.entry_kind(stale) {
        Ok(Some(EntryKind::File)) => {}
        Ok(_) => return false,
        Err(e) => {
            debug!(path = %stale, error = %e, "could not check for outdated index");
            return false;
        }
    }
    match pal.remove_file(stale) {
        Ok(()) => {
            info!(path = %stale, "removed outdated index");
            true
        }
        Err(e) => {
            debug!(path = %stale, error = %e, "could not remove outdated index");
            false
        }
    }
}

/// Outcomes of a tree-wide rebuild, in visiting order.
#[derive(Debug, Default)]
pub struct TreeReport {
    pub outcomes: Vec<IndexOutcome>,
    /// Folders whose children could not be listed; their subtrees were not visited.
    pub unlisted: Vec<FilePath>,
}

impl TreeReport {
    pub fn written(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_written()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, IndexOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    /// Every folder was visited and none of them failed.
    pub fn is_complete(&self) -> bool {
        self.failed() == 0 && self.unlisted.is_empty()
    }
}

/// Rebuild the index of `root` and of every folder below it.
///
/// Folders are visited depth-first, parents before children, siblings in store order.
/// Children are listed after the parent's rebuild, so the traversal follows the store
/// as it is at that moment. A failure in one folder does not stop the others.
#[instrument(skip(pal, settings), fields(root = %root))]
pub fn update_index_tree(
    pal: &PalHandle,
    root: &FilePath,
    settings: &IndexSettings,
    previous_index_file_name: Option<&str>,
) -> TreeReport {
    let mut report = TreeReport::default();
    let mut pending = vec![root.clone()];
    while let Some(folder) = pending.pop() {
        let outcome = update_index(pal, &folder, settings, previous_index_file_name);
        let visit_children = !matches!(outcome, IndexOutcome::Skipped { .. });
        report.outcomes.push(outcome);
        if !visit_children {
            continue;
        }
        match pal.list_directory(&folder) {
            Ok(children) => pending.extend(
                children
                    .into_iter()
                    .rev()
                    .filter(|child| child.is_folder())
                    .map(|child| child.path),
            ),
            Err(e) => {
                warn!(folder = %folder, error = %e, "failed to list subfolders");
                report.unlisted.push(folder);
            }
        }
    }
    info!(
        written = report.written(),
        skipped = report.skipped(),
        failed = report.failed(),
        unlisted = report.unlisted.len(),
        "rebuilt index tree"
    );
    report
}
