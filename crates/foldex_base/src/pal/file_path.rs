use relative_path::{RelativePath, RelativePathBuf};
use std::path::Path;

/* 📖 # Why use RelativePathBuf for FilePath?

FilePath wraps RelativePathBuf so that every path handled by the engine is relative
to the store root, never an absolute system path. The root folder itself is the
empty path. Paths are normalized on construction: empty segments and `.` segments
are dropped, so `"/Notes//draft.md"` and `"Notes/draft.md"` compare equal.
*/

/// Type-safe wrapper for `/`-separated paths relative to the store root.
///
/// # Examples
///
/// ```
/// use foldex_base::FilePath;
///
/// let path = FilePath::from("Notes/draft.md");
/// assert_eq!(path.file_name(), Some("draft.md"));
/// assert_eq!(path.parent(), Some(FilePath::from("Notes")));
/// assert!(FilePath::root().is_root());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePath(RelativePathBuf);

fn normalize(raw: &str) -> RelativePathBuf {
    let segments: Vec<&str> = raw
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    RelativePathBuf::from(segments.join("/"))
}

impl FilePath {
    /// The root folder of the store.
    pub fn root() -> Self {
        Self(RelativePathBuf::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.as_str().is_empty()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the underlying RelativePathBuf as a reference.
    pub fn as_relative(&self) -> &RelativePath {
        &self.0
    }

    /// Converts to a regular Path for use with std::fs operations.
    /// This returns the relative path portion without a base directory.
    pub fn as_path(&self) -> &Path {
        Path::new(self.as_relative().as_str())
    }

    /// The last segment of the path, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.as_str().rsplit('/').next()
    }

    /// The containing folder; the root for top-level entries, `None` for the root itself.
    pub fn parent(&self) -> Option<FilePath> {
        if self.is_root() {
            return None;
        }
        match self.as_str().rsplit_once('/') {
            Some((parent, _)) => Some(FilePath::from(parent)),
            None => Some(FilePath::root()),
        }
    }

    /// Appends a segment (or a `/`-separated relative path).
    pub fn join(&self, name: &str) -> FilePath {
        FilePath::from(format!("{}/{}", self.as_str(), name))
    }

    /// Returns true if `self` is `other` or lies below it.
    pub fn starts_with(&self, other: &FilePath) -> bool {
        other.is_root()
            || self == other
            || self
                .as_str()
                .strip_prefix(other.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self(normalize(s))
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        Self(normalize(&s))
    }
}

impl From<&RelativePath> for FilePath {
    fn from(p: &RelativePath) -> Self {
        Self(normalize(p.as_str()))
    }
}

impl From<&Path> for FilePath {
    fn from(p: &Path) -> Self {
        Self(normalize(&p.to_string_lossy()))
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<RelativePath> for FilePath {
    fn as_ref(&self) -> &RelativePath {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_file_path_from_str() {
        let path = FilePath::from("src/main.rs");
        assert_eq!(path.as_path(), Path::new("src/main.rs"));
    }

    #[test]
    fn test_file_path_normalizes_separators() {
        assert_eq!(FilePath::from("/Notes//draft.md/"), FilePath::from("Notes/draft.md"));
        assert_eq!(FilePath::from("./Notes/./a.md"), FilePath::from("Notes/a.md"));
        assert_eq!(FilePath::from("/Index.md").as_str(), "Index.md");
        assert!(FilePath::from("/").is_root());
    }

    #[test]
    fn test_file_path_from_pathbuf() {
        let pb = PathBuf::from("docs/readme.md");
        let path = FilePath::from(pb.as_path());
        assert_eq!(path.as_str(), "docs/readme.md");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(FilePath::from("Notes/Archive").file_name(), Some("Archive"));
        assert_eq!(FilePath::from("draft.md").file_name(), Some("draft.md"));
        assert_eq!(FilePath::root().file_name(), None);
    }

    #[test]
    fn test_parent() {
        assert_eq!(
            FilePath::from("Notes/Archive/old.md").parent(),
            Some(FilePath::from("Notes/Archive"))
        );
        assert_eq!(FilePath::from("Notes").parent(), Some(FilePath::root()));
        assert_eq!(FilePath::root().parent(), None);
    }

    #[test]
    fn test_join() {
        assert_eq!(FilePath::root().join("Index.md").as_str(), "Index.md");
        assert_eq!(
            FilePath::from("Notes").join("Index.md").as_str(),
            "Notes/Index.md"
        );
    }

    #[test]
    fn test_starts_with() {
        let notes = FilePath::from("Notes");
        assert!(FilePath::from("Notes/a.md").starts_with(&notes));
        assert!(notes.starts_with(&notes));
        assert!(!FilePath::from("Notebook/a.md").starts_with(&notes));
        assert!(notes.starts_with(&FilePath::root()));
    }

    #[test]
    fn test_file_path_display() {
        let path = FilePath::from("src/main.rs");
        assert_eq!(path.to_string(), "src/main.rs".to_string());
    }

    #[test]
    fn test_file_path_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(FilePath::from("test1.txt"));
        set.insert(FilePath::from("test2.txt"));
        assert!(set.contains(&FilePath::from("/test1.txt")));
        assert!(!set.contains(&FilePath::from("test3.txt")));
    }
}
