pub mod builder;
pub mod dispatcher;
pub mod folder;
pub mod human_name;
pub mod ignore;
pub mod planner;
pub mod service;
pub mod settings;
pub mod updater;

pub use builder::{ROOT_LABEL, build_index_content};
pub use dispatcher::{
    DEFAULT_SETTLE_DELAY, DispatchMessage, Dispatcher, DispatcherHandle, rebuild_tree,
};
pub use folder::{FolderSnapshot, ParentFolder};
pub use human_name::{strip_extension, to_human_name};
pub use ignore::IgnoreRules;
pub use planner::{ChangeEvent, RebuildPlan, RebuildTarget, plan_rebuild};
pub use service::{IndexService, Watching};
pub use settings::{
    DEFAULT_IGNORED_PATTERNS, DEFAULT_INDEX_FILE_NAME, DEFAULT_SETTINGS_PATH, IndexFileNameChange,
    IndexSettings, SETTINGS_DIRECTORY, SettingsHandle, load_settings, save_settings,
};
pub use updater::{IndexOutcome, SkipReason, TreeReport, update_index, update_index_tree};
