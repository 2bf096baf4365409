/* 📖 # Why is there an IndexService on top of the dispatcher?

Front ends (the CLI today) need one object that owns the store handle and the
settings and exposes the configuration surface: read the settings, change the
index file name, change the ignore patterns, rebuild on demand and start
watching. Changing the index file name must trigger the tree-wide rebuild that
removes indexes under the old name. Without a running watch this happens
synchronously; while watching it is handed to the dispatcher thread so it is
ordered with the store notifications.
*/

use std::time::Duration;

use tracing::{debug, info, instrument};

use foldex_base::{FilePath, FoldexResult, PalHandle, WatchRegistration};

use crate::dispatcher::{
    DEFAULT_SETTLE_DELAY, DispatchMessage, Dispatcher, DispatcherHandle, rebuild_tree,
};
use crate::planner::ChangeEvent;
use crate::settings::{IndexSettings, SettingsHandle};
use crate::updater::{IndexOutcome, TreeReport, update_index};

#[derive(Debug, Clone)]
pub struct IndexService {
    pal: PalHandle,
    settings: SettingsHandle,
    settle_delay: Duration,
}

impl IndexService {
    pub fn new(pal: PalHandle, settings: SettingsHandle) -> Self {
        Self {
            pal,
            settings,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Open the store with settings loaded from `settings_path` (defaults if absent).
    pub fn open(pal: PalHandle, settings_path: FilePath) -> FoldexResult<Self> {
        let settings = SettingsHandle::load(pal.clone(), settings_path)?;
        Ok(Self::new(pal, settings))
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> IndexSettings {
        self.settings.get()
    }

    /// Change the index file name and rebuild every folder under the new name.
    ///
    /// Returns `None` when the name did not change (blank or identical input).
    pub fn set_index_file_name(&self, name: &str) -> FoldexResult<Option<TreeReport>> {
        let Some(change) = self.settings.set_index_file_name(name)? else {
            return Ok(None);
        };
        Ok(Some(rebuild_tree(
            &self.pal,
            &self.settings,
            &FilePath::root(),
            Some(&change.previous),
        )))
    }

    /// Replace the ignore patterns. Indexes pick them up on their next rebuild.
    pub fn set_ignored_patterns(&self, raw: &str) -> FoldexResult<()> {
        self.settings.set_ignored_patterns(raw)
    }

    pub fn rebuild_folder(&self, folder: &FilePath) -> IndexOutcome {
        update_index(&self.pal, folder, &self.settings.get(), None)
    }

    /// Rebuild every folder, finishing an index rename that was interrupted.
    pub fn rebuild_all(&self) -> TreeReport {
        let previous = self.settings.get().previous_index_file_name;
        rebuild_tree(
            &self.pal,
            &self.settings,
            &FilePath::root(),
            previous.as_deref(),
        )
    }

    /// Start reacting to store changes.
    ///
    /// Each call starts its own dispatcher. The store callback stays registered until the
    /// returned [`Watching`] is dropped or shut down.
    #[instrument(skip(self))]
    pub fn watch(&self) -> FoldexResult<Watching> {
        let dispatcher = DispatcherHandle::spawn(Dispatcher::new(
            self.pal.clone(),
            self.settings.clone(),
            self.settle_delay,
        ))?;
        let sender = dispatcher.sender();
        let registration = self.pal.watch_directory(
            &FilePath::root(),
            Box::new(move |event| {
                if sender.send(DispatchMessage::Event(event.into())).is_err() {
                    debug!("dispatcher stopped, dropping change notification");
                }
            }),
        )?;
        info!(settle_delay = ?self.settle_delay, "watching for changes");
        Ok(Watching {
            registration,
            dispatcher,
            settings: self.settings.clone(),
        })
    }
}

/// A running watch. Dropping it unregisters the store callback, then stops the dispatcher.
#[derive(Debug)]
pub struct Watching {
    registration: WatchRegistration,
    dispatcher: DispatcherHandle,
    settings: SettingsHandle,
}

impl Watching {
    /// Feed an event in addition to the store notifications.
    pub fn submit(&self, event: impl Into<ChangeEvent>) -> bool {
        self.dispatcher.submit(event)
    }

    /// Change the index file name; the tree rebuild runs on the dispatcher thread.
    ///
    /// Returns whether the name changed.
    pub fn set_index_file_name(&self, name: &str) -> FoldexResult<bool> {
        match self.settings.set_index_file_name(name)? {
            Some(change) => {
                self.dispatcher.submit(change);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn shutdown(self) {
        let Watching {
            registration,
            dispatcher,
            ..
        } = self;
        drop(registration);
        dispatcher.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DEFAULT_INDEX_FILE_NAME, load_settings};
    use foldex_base::{FileChangeEvent, MockPal, Pal};

    fn service() -> (MockPal, PalHandle, IndexService) {
        let mock = MockPal::new();
        let pal = PalHandle::new(mock.clone());
        let service = IndexService::open(pal.clone(), FilePath::from("settings.toml"))
            .unwrap()
            .with_settle_delay(Duration::ZERO);
        (mock, pal, service)
    }

    fn exists(pal: &PalHandle, path: &str) -> bool {
        pal.file_exists(&FilePath::from(path)).unwrap()
    }

    #[test]
    fn test_open_without_settings_file_uses_defaults() {
        let (_mock, _pal, service) = service();
        assert_eq!(service.settings(), IndexSettings::default());
    }

    #[test]
    fn test_set_index_file_name_renames_every_index() {
        let (mock, pal, service) = service();
        mock.add_file(FilePath::from("Notes/draft.md"), Vec::new());
        mock.add_file(FilePath::from("Notes/Deep/x.md"), Vec::new());
        service.rebuild_all();
        assert!(exists(&pal, "Notes/Deep/Index.md"));

        let report = service.set_index_file_name(" README.md ").unwrap().unwrap();

        assert_eq!(report.written(), 3);
        for folder in ["", "Notes/", "Notes/Deep/"] {
            assert!(!exists(&pal, &format!("{}Index.md", folder)));
            assert!(exists(&pal, &format!("{}README.md", folder)));
        }
        let persisted = load_settings(&pal, &FilePath::from("settings.toml")).unwrap();
        assert_eq!(persisted.index_file_name, "README.md");
        assert_eq!(persisted.previous_index_file_name, None);
    }

    #[test]
    fn test_blank_or_unchanged_name_does_nothing() {
        let (mock, _pal, service) = service();
        mock.add_directory(FilePath::from("Notes"));

        assert!(service.set_index_file_name("   ").unwrap().is_none());
        assert!(
            service
                .set_index_file_name(DEFAULT_INDEX_FILE_NAME)
                .unwrap()
                .is_none()
        );
        assert_eq!(mock.write_count(), 0);
        assert_eq!(service.settings().index_file_name, DEFAULT_INDEX_FILE_NAME);
    }

    #[test]
    fn test_set_ignored_patterns_does_not_rebuild() {
        let (mock, pal, service) = service();
        mock.add_file(FilePath::from("Notes/tmp_a.md"), Vec::new());

        service.set_ignored_patterns("^tmp_").unwrap();

        assert!(!exists(&pal, "Notes/Index.md"));
        assert_eq!(service.settings().ignored_patterns, "^tmp_");
        service.rebuild_folder(&FilePath::from("Notes"));
        assert_eq!(
            pal.read_file_to_string(&FilePath::from("Notes/Index.md"))
                .unwrap(),
            "# Notes [[Index.md|Back to Root]]\n\n"
        );
    }

    #[test]
    fn test_rebuild_all_finishes_interrupted_rename() {
        let mock = MockPal::new();
        mock.add_file(
            FilePath::from("settings.toml"),
            b"index_file_name = \"New.md\"\nprevious_index_file_name = \"Old.md\"\n".to_vec(),
        );
        mock.add_file(FilePath::from("Notes/Old.md"), Vec::new());
        let pal = PalHandle::new(mock);
        let service = IndexService::open(pal.clone(), FilePath::from("settings.toml")).unwrap();

        let report = service.rebuild_all();

        assert!(report.is_complete());
        assert!(!exists(&pal, "Notes/Old.md"));
        assert!(exists(&pal, "Notes/New.md"));
        assert_eq!(service.settings().previous_index_file_name, None);
    }

    #[test]
    fn test_watch_rebuilds_on_store_notifications() {
        let (mock, pal, service) = service();
        let watching = service.watch().unwrap();

        mock.add_file(FilePath::from("Notes/draft.md"), Vec::new());
        mock.emit(FileChangeEvent::Created {
            path: FilePath::from("Notes/draft.md"),
        });
        mock.add_directory(FilePath::from("Notes/Later"));
        mock.emit(FileChangeEvent::Renamed {
            from: FilePath::from("Notes/Sooner"),
            to: FilePath::from("Notes/Later"),
        });
        watching.shutdown();

        assert_eq!(
            pal.read_file_to_string(&FilePath::from("Notes/Index.md"))
                .unwrap(),
            "# Notes [[Index.md|Back to Root]]\n\n- [[Notes/draft|Draft]]\n- [[Notes/Later/Index.md|Later]]\n"
        );
        assert!(exists(&pal, "Notes/Later/Index.md"));
    }

    #[test]
    fn test_each_watch_is_unregistered_when_it_ends() {
        let (mock, pal, service) = service();
        let first = service.watch().unwrap();
        let second = service.watch().unwrap();
        assert_eq!(mock.watcher_count(), 2);

        first.shutdown();
        assert_eq!(mock.watcher_count(), 1);
        mock.add_file(FilePath::from("Notes/draft.md"), Vec::new());
        mock.emit(FileChangeEvent::Created {
            path: FilePath::from("Notes/draft.md"),
        });
        drop(second);

        assert_eq!(mock.watcher_count(), 0);
        assert!(exists(&pal, "Notes/Index.md"));
    }

    #[test]
    fn test_watching_index_rename_runs_on_dispatcher() {
        let (mock, pal, service) = service();
        mock.add_file(FilePath::from("Notes/Index.md"), Vec::new());
        let watching = service.watch().unwrap();

        assert!(watching.set_index_file_name("Home.md").unwrap());
        assert!(!watching.set_index_file_name("Home.md").unwrap());
        watching.shutdown();

        assert!(!exists(&pal, "Notes/Index.md"));
        assert!(exists(&pal, "Notes/Home.md"));
        assert!(exists(&pal, "Home.md"));
        assert_eq!(service.settings().index_file_name, "Home.md");
    }
}
