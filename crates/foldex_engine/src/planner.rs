/* 📖 # Why is deciding what to rebuild separate from rebuilding?

Store notifications and configuration changes arrive as ChangeEvents. Which
folders they affect depends only on the event and the settings, so plan_rebuild
is a pure function that can be tested exhaustively. The Dispatcher owns the
side effects: validating renames against the store, the settle delay and the
actual update_index calls.
*/

use foldex_base::{FileChangeEvent, FilePath};

use crate::settings::{IndexFileNameChange, IndexSettings};

/// Everything the dispatcher reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created { path: FilePath },
    Deleted { path: FilePath },
    Renamed { from: FilePath, to: FilePath },
    IndexFileNameChanged { previous: String, current: String },
}

impl From<FileChangeEvent> for ChangeEvent {
    fn from(event: FileChangeEvent) -> Self {
        match event {
            FileChangeEvent::Created { path } => ChangeEvent::Created { path },
            FileChangeEvent::Deleted { path } => ChangeEvent::Deleted { path },
            FileChangeEvent::Renamed { from, to } => ChangeEvent::Renamed { from, to },
        }
    }
}

impl From<IndexFileNameChange> for ChangeEvent {
    fn from(change: IndexFileNameChange) -> Self {
        ChangeEvent::IndexFileNameChanged {
            previous: change.previous,
            current: change.current,
        }
    }
}

/// A unit of rebuild work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildTarget {
    /// Rebuild a single folder.
    Folder(FilePath),
    /// Rebuild `root` and every folder below it, removing indexes left under the previous name.
    Tree {
        root: FilePath,
        previous_index_file_name: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RebuildPlan {
    pub targets: Vec<RebuildTarget>,
    /// Wait for the settle delay before running the targets.
    pub settle: bool,
}

impl RebuildPlan {
    fn now(targets: Vec<RebuildTarget>) -> Self {
        Self {
            targets,
            settle: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Decide which folders `event` makes outdated.
pub fn plan_rebuild(event: &ChangeEvent, settings: &IndexSettings) -> RebuildPlan {
    match event {
        ChangeEvent::Created { path } => {
            // Writing an index reports its creation; listings never include the index
            if path.file_name() == Some(settings.index_file_name.as_str()) {
                return RebuildPlan::default();
            }
            RebuildPlan::now(path.parent().map(RebuildTarget::Folder).into_iter().collect())
        }
        ChangeEvent::Deleted { path } => {
            RebuildPlan::now(path.parent().map(RebuildTarget::Folder).into_iter().collect())
        }
        ChangeEvent::Renamed { from, to } => {
            let mut targets = vec![RebuildTarget::Folder(to.clone())];
            let new_parent = to.parent();
            if let Some(parent) = &new_parent {
                targets.push(RebuildTarget::Folder(parent.clone()));
            }
            if let Some(old_parent) = from.parent()
                && Some(&old_parent) != new_parent.as_ref()
            {
                targets.push(RebuildTarget::Folder(old_parent));
            }
            RebuildPlan {
                targets,
                settle: true,
            }
        }
        ChangeEvent::IndexFileNameChanged { previous, .. } => {
            RebuildPlan::now(vec![RebuildTarget::Tree {
                root: FilePath::root(),
                previous_index_file_name: Some(previous.clone()),
            }])
        }
    }
}
