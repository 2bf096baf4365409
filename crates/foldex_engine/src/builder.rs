/* 📖 # Why is the index content a pure function of a snapshot?

build_index_content never touches the store. It receives a FolderSnapshot that
was read just before and the settings in effect, and renders the document from
those alone. The same snapshot and settings always give byte-identical output,
so a rebuild that races with another one for the same folder writes a valid
document either way, and the rendering can be tested without any store.
*/

use foldex_base::{DirEntry, FilePath};

use crate::folder::FolderSnapshot;
use crate::human_name::{strip_extension, to_human_name};
use crate::ignore::IgnoreRules;
use crate::settings::IndexSettings;

/// Label used for the back-link of folders whose parent is the store root.
pub const ROOT_LABEL: &str = "Root";

const MARKDOWN_EXTENSION: &str = ".md";

/// Render the index document for `folder`.
pub fn build_index_content(folder: &FolderSnapshot, settings: &IndexSettings) -> String {
    let rules = IgnoreRules::parse(&settings.ignored_patterns);
    let index_file_name = settings.index_file_name.as_str();

    let mut content = title_line(folder, index_file_name);
    content.push_str("\n\n");
    for child in folder
        .children
        .iter()
        .filter(|child| child.name != index_file_name && !rules.is_ignored(&child.name))
    {
        content.push_str(&format!(
            "- [[{}|{}]]\n",
            link_target(child, index_file_name),
            to_human_name(strip_extension(&child.name))
        ));
    }
    content
}

fn title_line(folder: &FolderSnapshot, index_file_name: &str) -> String {
    let (parent_path, parent_name) = match &folder.parent {
        Some(parent) => (parent.path.clone(), parent.name.as_str()),
        None => (FilePath::root(), ""),
    };
    let parent_label = if parent_name.is_empty() {
        ROOT_LABEL
    } else {
        parent_name
    };
    format!(
        "# {} [[{}|Back to {}]]",
        to_human_name(&folder.name),
        parent_path.join(index_file_name),
        to_human_name(parent_label)
    )
}

/// Folders link to their own index, markdown documents by path without the extension,
/// everything else by full path.
fn link_target(child: &DirEntry, index_file_name: &str) -> FilePath {
    if child.is_folder() {
        return child.path.join(index_file_name);
    }
    match child.path.as_str().strip_suffix(MARKDOWN_EXTENSION) {
        Some(stem) if child.name != MARKDOWN_EXTENSION => FilePath::from(stem),
        _ => child.path.clone(),
    }
}
