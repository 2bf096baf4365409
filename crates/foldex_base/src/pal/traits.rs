use std::io::{Read, Seek, Write};
use std::sync::Arc;

use crate::error::ErrorKind;
use crate::{FoldexError, FoldexResult};

use super::file_path::FilePath;

/* 📖 # What is the Platform Abstraction Layer (PAL)?

The PAL is the hierarchical store the index engine works against: resolve a path,
list a folder's children in their natural order, read/write/remove documents and
observe changes. The engine never touches `std::fs` directly. RealPal backs it with
the real filesystem, MockPal with an in-memory tree for tests.
*/

/// Trait combining Read + Seek for file operations.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Whether a store entry is a folder or a leaf document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Folder,
    File,
}

/// A direct child of a folder as reported by [`Pal::list_directory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Bare name (last path segment).
    pub name: String,
    /// Full path relative to the store root.
    pub path: FilePath,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn new(path: FilePath, kind: EntryKind) -> Self {
        let name = path.file_name().unwrap_or_default().to_string();
        Self { name, path, kind }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// Change notification delivered by [`Pal::watch_directory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChangeEvent {
    Created { path: FilePath },
    Deleted { path: FilePath },
    Renamed { from: FilePath, to: FilePath },
}

/// Callback invoked when watched files change.
pub type FileChangeCallback = Box<dyn Fn(FileChangeEvent) + Send + Sync>;

/// Keeps a [`Pal::watch_directory`] callback registered. Dropping it unregisters the callback.
#[must_use = "dropping the registration stops the change notifications"]
pub struct WatchRegistration {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchRegistration {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for WatchRegistration {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for WatchRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRegistration")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Platform Abstraction Layer (PAL) trait providing the store operations.
pub trait Pal: std::fmt::Debug + Send + Sync + 'static {
    /// Check if a file or folder exists at the given path.
    fn file_exists(&self, path: &FilePath) -> FoldexResult<bool>;

    /// Resolve a path to the kind of entry stored there, or `None` if absent.
    fn entry_kind(&self, path: &FilePath) -> FoldexResult<Option<EntryKind>>;

    /// List the direct children of a folder in the store's natural, stable order.
    ///
    /// Fails when `path` does not resolve to a folder.
    fn list_directory(&self, path: &FilePath) -> FoldexResult<Vec<DirEntry>>;

    /// Open a file for reading.
    fn read_file(&self, path: &FilePath) -> FoldexResult<Box<dyn ReadSeek + 'static>>;

    /// Read entire file contents as a UTF-8 string.
    fn read_file_to_string(&self, path: &FilePath) -> FoldexResult<String> {
        let mut reader = self.read_file(path)?;
        let mut contents = Vec::new();
        reader
            .read_to_end(&mut contents)
            .map_err(|e| FoldexError::file_error(path.as_path(), e))?;
        String::from_utf8(contents).map_err(|_e| crate::err!("File is not valid UTF-8: {}", path))
    }

    /// Create a new file, overwriting if it exists.
    fn create_file(&self, path: &FilePath) -> FoldexResult<Box<dyn Write>>;

    /// Create or overwrite a file with the given text content.
    fn write_file(&self, path: &FilePath, content: &str) -> FoldexResult<()> {
        let mut writer = self.create_file(path)?;
        writer
            .write_all(content.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| FoldexError::file_error(path.as_path(), e))?;
        Ok(())
    }

    /// Remove a file.
    fn remove_file(&self, path: &FilePath) -> FoldexResult<()>;

    /// Create a directory and all parent directories.
    fn create_directory_all(&self, path: &FilePath) -> FoldexResult<()>;

    /// Watch a directory tree for changes.
    ///
    /// Returns immediately. The callback is invoked from a background thread until the
    /// returned registration is dropped.
    fn watch_directory(
        &self,
        directory: &FilePath,
        callback: FileChangeCallback,
    ) -> FoldexResult<WatchRegistration>;
}

/// Builds the error returned when a folder operation targets something else.
pub(crate) fn not_a_folder(path: &FilePath) -> Box<FoldexError> {
    Box::new(FoldexError::new(ErrorKind::NotAFolder {
        path: path.to_string(),
    }))
}

/// Handle to a PAL implementation, enabling shared ownership.
///
/// Internally wraps `Arc<dyn Pal>` for cheap cloning and thread-safe sharing.
///
/// # Examples
///
/// ```no_run
/// use foldex_base::{RealPal, PalHandle};
///
/// let pal = PalHandle::new(RealPal::new(".".into()));
/// let pal_clone = pal.clone(); // Cheap clone, shares the same implementation
/// ```
#[derive(Debug, Clone)]
pub struct PalHandle(Arc<dyn Pal>);

impl PalHandle {
    /// Create a new PalHandle from a Pal implementation.
    pub fn new(pal: impl Pal + 'static) -> Self {
        Self(Arc::new(pal))
    }
}

impl std::ops::Deref for PalHandle {
    type Target = dyn Pal;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
