use tracing::debug;

use foldex_base::{DirEntry, EntryKind, FilePath, FoldexResult, PalHandle, ResultExt};

/// The parent of a folder, referenced by path and name only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentFolder {
    pub path: FilePath,
    /// Bare name; empty for the store root.
    pub name: String,
}

/// A folder and its direct children as read from the store at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSnapshot {
    pub path: FilePath,
    /// Bare name; empty for the store root.
    pub name: String,
    /// `None` for the store root.
    pub parent: Option<ParentFolder>,
    /// Direct children in the store's natural order.
    pub children: Vec<DirEntry>,
}

impl FolderSnapshot {
    /// Read the folder at `path`.
    ///
    /// Returns `Ok(None)` when the path does not exist or is not a folder.
    pub fn read(pal: &PalHandle, path: &FilePath) -> FoldexResult<Option<Self>> {
        match pal.entry_kind(path)? {
            Some(EntryKind::Folder) => {}
            other => {
                debug!(path = %path, kind = ?other, "not a folder");
                return Ok(None);
            }
        }
        let children = pal
            .list_directory(path)
            .with_context(|| format!("Failed to list children of '{}'", path))?;
        let parent = path.parent().map(|parent_path| ParentFolder {
            name: parent_path.file_name().unwrap_or_default().to_string(),
            path: parent_path,
        });
        Ok(Some(Self {
            path: path.clone(),
            name: path.file_name().unwrap_or_default().to_string(),
            parent,
            children,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foldex_base::MockPal;

    #[test]
    fn test_read_nested_folder() {
        let mock = MockPal::new();
        mock.add_file(FilePath::from("Notes/Archive/old.md"), Vec::new());
        mock.add_file(FilePath::from("Notes/Archive/older.md"), Vec::new());
        let pal = PalHandle::new(mock);

        let snapshot = FolderSnapshot::read(&pal, &FilePath::from("Notes/Archive"))
            .unwrap()
            .unwrap();

        assert_eq!(snapshot.name, "Archive");
        assert_eq!(
            snapshot.parent,
            Some(ParentFolder {
                path: FilePath::from("Notes"),
                name: "Notes".to_string(),
            })
        );
        assert_eq!(snapshot.children.len(), 2);
    }

    #[test]
    fn test_read_root_and_top_level() {
        let mock = MockPal::new();
        mock.add_directory(FilePath::from("Notes"));
        let pal = PalHandle::new(mock);

        let root = FolderSnapshot::read(&pal, &FilePath::root()).unwrap().unwrap();
        assert_eq!(root.name, "");
        assert_eq!(root.parent, None);

        let notes = FolderSnapshot::read(&pal, &FilePath::from("Notes"))
            .unwrap()
            .unwrap();
        assert_eq!(notes.parent.map(|p| p.name), Some(String::new()));
    }

    #[test]
    fn test_read_file_or_missing_is_none() {
        let mock = MockPal::new();
        mock.add_file(FilePath::from("draft.md"), Vec::new());
        let pal = PalHandle::new(mock);

        assert_eq!(
            FolderSnapshot::read(&pal, &FilePath::from("draft.md")).unwrap(),
            None
        );
        assert_eq!(
            FolderSnapshot::read(&pal, &FilePath::from("missing")).unwrap(),
            None
        );
    }
}
