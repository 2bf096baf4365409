use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::FoldexResult;

use super::FilePath;
use super::traits::{
    DirEntry, EntryKind, FileChangeCallback, FileChangeEvent, Pal, ReadSeek, WatchRegistration,
    not_a_folder,
};

/* 📖 # Why does MockPal keep an explicit entry order?

Index documents list children in the store's natural order, and tests assert on
that order. The mock therefore records entries in insertion order instead of
relying on HashMap iteration. Parent folders are created implicitly, the same way
a file can only exist inside an existing folder on disk.
*/

#[derive(Debug, Default)]
struct MockTree {
    files: HashMap<FilePath, Vec<u8>>,
    folders: HashSet<FilePath>,
    order: Vec<FilePath>,
    failing: HashSet<FilePath>,
}

impl MockTree {
    fn kind(&self, path: &FilePath) -> Option<EntryKind> {
        if path.is_root() || self.folders.contains(path) {
            Some(EntryKind::Folder)
        } else if self.files.contains_key(path) {
            Some(EntryKind::File)
        } else {
            None
        }
    }

    fn ensure_folder(&mut self, path: &FilePath) {
        if path.is_root() || self.folders.contains(path) {
            return;
        }
        if let Some(parent) = path.parent() {
            self.ensure_folder(&parent);
        }
        self.folders.insert(path.clone());
        self.order.push(path.clone());
    }

    fn insert_file(&mut self, path: FilePath, content: Vec<u8>) {
        if let Some(parent) = path.parent() {
            self.ensure_folder(&parent);
        }
        if !self.files.contains_key(&path) {
            self.order.push(path.clone());
        }
        self.files.insert(path, content);
    }

    fn remove(&mut self, path: &FilePath) {
        self.files.retain(|p, _| !p.starts_with(path));
        self.folders.retain(|p| !p.starts_with(path));
        self.order.retain(|p| !p.starts_with(path));
    }
}

struct MockWatcher {
    id: usize,
    directory: FilePath,
    callback: FileChangeCallback,
}

/// In-memory PAL implementation for testing.
///
/// # Examples
///
/// ```
/// use foldex_base::{MockPal, Pal, FilePath};
///
/// let mock = MockPal::new();
/// mock.add_file(FilePath::from("Notes/draft.md"), b"content".to_vec());
/// let content = mock.read_file_to_string(&FilePath::from("Notes/draft.md")).unwrap();
/// assert_eq!(content, "content");
/// assert!(mock.file_exists(&FilePath::from("Notes")).unwrap());
/// ```
#[derive(Clone)]
pub struct MockPal {
    tree: Arc<Mutex<MockTree>>,
    watchers: Arc<Mutex<Vec<MockWatcher>>>,
    next_watcher_id: Arc<AtomicUsize>,
    write_count: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockPal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPal")
            .field("tree", &self.tree)
            .field("write_count", &self.write_count)
            .finish_non_exhaustive()
    }
}

impl MockPal {
    /// Create a new store containing only the empty root folder.
    pub fn new() -> Self {
        Self {
            tree: Arc::new(Mutex::new(MockTree::default())),
            watchers: Arc::new(Mutex::new(Vec::new())),
            next_watcher_id: Arc::new(AtomicUsize::new(0)),
            write_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add a file, creating missing parent folders.
    pub fn add_file(&self, path: FilePath, content: Vec<u8>) {
        self.tree.lock().unwrap().insert_file(path, content);
    }

    /// Add a folder, creating missing parent folders.
    pub fn add_directory(&self, path: FilePath) {
        self.tree.lock().unwrap().ensure_folder(&path);
    }

    /// Remove a file or a folder with everything below it, without notifying watchers.
    pub fn remove_entry(&self, path: &FilePath) {
        self.tree.lock().unwrap().remove(path);
    }

    /// Make writes and removals of exactly this path fail.
    pub fn fail_on(&self, path: FilePath) {
        self.tree.lock().unwrap().failing.insert(path);
    }

    /// Number of files written through [`Pal::create_file`] so far.
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Deliver a change notification to every callback watching an ancestor of the event.
    pub fn emit(&self, event: FileChangeEvent) {
        let path = match &event {
            FileChangeEvent::Created { path } | FileChangeEvent::Deleted { path } => path,
            FileChangeEvent::Renamed { to, .. } => to,
        };
        let watchers = self.watchers.lock().unwrap();
        for watcher in watchers.iter() {
            if path.starts_with(&watcher.directory) {
                (watcher.callback)(event.clone());
            }
        }
    }

    /// Number of callbacks whose registration is still alive.
    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().unwrap().len()
    }

    fn injected_failure(&self, path: &FilePath, action: &str) -> FoldexResult<()> {
        if self.tree.lock().unwrap().failing.contains(path) {
            return Err(crate::FoldexError::file_error(
                path.as_path(),
                std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    format!("injected {} failure", action),
                ),
            ));
        }
        Ok(())
    }
}

impl Default for MockPal {
    fn default() -> Self {
        Self::new()
    }
}

impl Pal for MockPal {
    fn file_exists(&self, path: &FilePath) -> FoldexResult<bool> {
        Ok(self.tree.lock().unwrap().kind(path).is_some())
    }

    fn entry_kind(&self, path: &FilePath) -> FoldexResult<Option<EntryKind>> {
        Ok(self.tree.lock().unwrap().kind(path))
    }

    fn list_directory(&self, path: &FilePath) -> FoldexResult<Vec<DirEntry>> {
        let tree = self.tree.lock().unwrap();
        if tree.kind(path) != Some(EntryKind::Folder) {
            return Err(not_a_folder(path));
        }
        Ok(tree
            .order
            .iter()
            .filter(|entry| entry.parent().as_ref() == Some(path))
            .filter_map(|entry| tree.kind(entry).map(|kind| DirEntry::new(entry.clone(), kind)))
            .collect())
    }

    fn read_file(&self, path: &FilePath) -> FoldexResult<Box<dyn ReadSeek + 'static>> {
        let tree = self.tree.lock().unwrap();
        let content = tree
            .files
            .get(path)
            .ok_or_else(|| {
                crate::FoldexError::file_error(
                    path.as_path(),
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("File not found: {}", path),
                    ),
                )
            })?
            .clone();
        Ok(Box::new(Cursor::new(content)))
    }

    fn create_file(&self, path: &FilePath) -> FoldexResult<Box<dyn Write>> {
        self.injected_failure(path, "write")?;
        if let Some(parent) = path.parent()
            && self.tree.lock().unwrap().kind(&parent) != Some(EntryKind::Folder)
        {
            return Err(not_a_folder(&parent));
        }
        self.write_count.fetch_add(1, Ordering::SeqCst);
        // Return a writer that will store in the mock storage when dropped
        Ok(Box::new(MockFileWriter {
            path: path.clone(),
            tree: Arc::clone(&self.tree),
            buffer: Vec::new(),
        }))
    }

    fn remove_file(&self, path: &FilePath) -> FoldexResult<()> {
        self.injected_failure(path, "remove")?;
        let mut tree = self.tree.lock().unwrap();
        if tree.kind(path) != Some(EntryKind::File) {
            return Err(crate::FoldexError::file_error(
                path.as_path(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            ));
        }
        tree.remove(path);
        Ok(())
    }

    fn create_directory_all(&self, path: &FilePath) -> FoldexResult<()> {
        self.tree.lock().unwrap().ensure_folder(path);
        Ok(())
    }

    fn watch_directory(
        &self,
        directory: &FilePath,
        callback: FileChangeCallback,
    ) -> FoldexResult<WatchRegistration> {
        if self.tree.lock().unwrap().kind(directory) != Some(EntryKind::Folder) {
            return Err(not_a_folder(directory));
        }
        let id = self.next_watcher_id.fetch_add(1, Ordering::SeqCst);
        self.watchers.lock().unwrap().push(MockWatcher {
            id,
            directory: directory.clone(),
            callback,
        });
        let watchers = Arc::downgrade(&self.watchers);
        Ok(WatchRegistration::new(move || {
            if let Some(watchers) = watchers.upgrade() {
                watchers.lock().unwrap().retain(|watcher| watcher.id != id);
            }
        }))
    }
}

/// Helper struct for writing files to MockPal.
struct MockFileWriter {
    path: FilePath,
    tree: Arc<Mutex<MockTree>>,
    buffer: Vec<u8>,
}

impl Write for MockFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for MockFileWriter {
    fn drop(&mut self) {
        if let Ok(mut tree) = self.tree.lock() {
            tree.insert_file(self.path.clone(), std::mem::take(&mut self.buffer));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn names(entries: &[DirEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_file_exists_true() {
        let pal = MockPal::new();
        pal.add_file(FilePath::from("test.txt"), b"content".to_vec());

        assert!(pal.file_exists(&FilePath::from("test.txt")).unwrap());
    }

    #[test]
    fn test_file_exists_false() {
        let pal = MockPal::new();

        assert!(!pal.file_exists(&FilePath::from("test.txt")).unwrap());
    }

    #[test]
    fn test_root_is_a_folder() {
        let pal = MockPal::new();
        assert_eq!(
            pal.entry_kind(&FilePath::root()).unwrap(),
            Some(EntryKind::Folder)
        );
    }

    #[test]
    fn test_add_file_creates_parent_folders() {
        let pal = MockPal::new();
        pal.add_file(FilePath::from("a/b/c.md"), Vec::new());

        assert_eq!(
            pal.entry_kind(&FilePath::from("a")).unwrap(),
            Some(EntryKind::Folder)
        );
        assert_eq!(
            pal.entry_kind(&FilePath::from("a/b")).unwrap(),
            Some(EntryKind::Folder)
        );
        assert_eq!(
            pal.entry_kind(&FilePath::from("a/b/c.md")).unwrap(),
            Some(EntryKind::File)
        );
    }

    #[test]
    fn test_list_directory_preserves_insertion_order() {
        let pal = MockPal::new();
        pal.add_file(FilePath::from("Notes/zeta.md"), Vec::new());
        pal.add_directory(FilePath::from("Notes/Archive"));
        pal.add_file(FilePath::from("Notes/alpha.md"), Vec::new());
        pal.add_file(FilePath::from("Notes/Archive/deep.md"), Vec::new());

        let entries = pal.list_directory(&FilePath::from("Notes")).unwrap();
        assert_eq!(names(&entries), vec!["zeta.md", "Archive", "alpha.md"]);
        assert!(entries[1].is_folder());

        let root = pal.list_directory(&FilePath::root()).unwrap();
        assert_eq!(names(&root), vec!["Notes"]);
    }

    #[test]
    fn test_list_directory_of_file_fails() {
        let pal = MockPal::new();
        pal.add_file(FilePath::from("a.md"), Vec::new());

        assert!(pal.list_directory(&FilePath::from("a.md")).is_err());
        assert!(pal.list_directory(&FilePath::from("missing")).is_err());
    }

    #[test]
    fn test_write_file_overwrites_in_place() {
        let pal = MockPal::new();
        pal.add_file(FilePath::from("Notes/a.md"), Vec::new());
        pal.add_file(FilePath::from("Notes/Index.md"), b"old".to_vec());
        pal.add_file(FilePath::from("Notes/b.md"), Vec::new());

        pal.write_file(&FilePath::from("Notes/Index.md"), "new").unwrap();

        assert_eq!(
            pal.read_file_to_string(&FilePath::from("Notes/Index.md"))
                .unwrap(),
            "new"
        );
        let entries = pal.list_directory(&FilePath::from("Notes")).unwrap();
        assert_eq!(names(&entries), vec!["a.md", "Index.md", "b.md"]);
        assert_eq!(pal.write_count(), 1);
    }

    #[test]
    fn test_create_file_in_missing_folder_fails() {
        let pal = MockPal::new();
        assert!(pal.create_file(&FilePath::from("missing/a.md")).is_err());
        assert_eq!(pal.write_count(), 0);
    }

    #[test]
    fn test_remove_file() {
        let pal = MockPal::new();
        pal.add_file(FilePath::from("Notes/Old.md"), Vec::new());

        pal.remove_file(&FilePath::from("Notes/Old.md")).unwrap();

        assert!(!pal.file_exists(&FilePath::from("Notes/Old.md")).unwrap());
        assert!(pal.remove_file(&FilePath::from("Notes/Old.md")).is_err());
    }

    #[test]
    fn test_remove_entry_removes_subtree() {
        let pal = MockPal::new();
        pal.add_file(FilePath::from("Notes/Archive/a.md"), Vec::new());
        pal.add_file(FilePath::from("Notebook.md"), Vec::new());

        pal.remove_entry(&FilePath::from("Notes"));

        assert!(!pal.file_exists(&FilePath::from("Notes/Archive")).unwrap());
        assert!(pal.file_exists(&FilePath::from("Notebook.md")).unwrap());
    }

    #[test]
    fn test_injected_failures() {
        let pal = MockPal::new();
        pal.add_file(FilePath::from("Locked/Index.md"), Vec::new());
        pal.fail_on(FilePath::from("Locked/Index.md"));

        assert!(
            pal.write_file(&FilePath::from("Locked/Index.md"), "x")
                .is_err()
        );
        assert!(pal.remove_file(&FilePath::from("Locked/Index.md")).is_err());
    }

    #[test]
    fn test_emit_reaches_matching_watchers() {
        let pal = MockPal::new();
        pal.add_directory(FilePath::from("Notes"));
        pal.add_directory(FilePath::from("Other"));
        let notes_hit = Arc::new(AtomicBool::new(false));
        let other_hit = Arc::new(AtomicBool::new(false));

        let flag = notes_hit.clone();
        let _notes = pal
            .watch_directory(
                &FilePath::from("Notes"),
                Box::new(move |_event| flag.store(true, Ordering::SeqCst)),
            )
            .unwrap();
        let flag = other_hit.clone();
        let _other = pal
            .watch_directory(
                &FilePath::from("Other"),
                Box::new(move |_event| flag.store(true, Ordering::SeqCst)),
            )
            .unwrap();

        pal.emit(FileChangeEvent::Created {
            path: FilePath::from("Notes/a.md"),
        });

        assert!(notes_hit.load(Ordering::SeqCst));
        assert!(!other_hit.load(Ordering::SeqCst));
    }

    #[test]
    fn test_dropped_registration_stops_notifications() {
        let pal = MockPal::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let first = pal
            .watch_directory(
                &FilePath::root(),
                Box::new(move |_event| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        let counter = hits.clone();
        let _second = pal
            .watch_directory(
                &FilePath::root(),
                Box::new(move |_event| {
                    counter.fetch_add(10, Ordering::SeqCst);
                }),
            )
            .unwrap();
        assert_eq!(pal.watcher_count(), 2);

        drop(first);
        pal.emit(FileChangeEvent::Deleted {
            path: FilePath::from("a.md"),
        });

        assert_eq!(pal.watcher_count(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_watch_missing_directory_fails() {
        let pal = MockPal::new();
        let result = pal.watch_directory(&FilePath::from("missing"), Box::new(|_event| {}));
        assert!(result.is_err());
    }
}
