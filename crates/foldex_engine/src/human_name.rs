//! Display names for index entries.

/// Turn a file or folder name into a display label.
///
/// Every run of `_` and `-` becomes a single space, then the first character of every
/// word is uppercased. Total over all inputs, including the empty string.
///
/// A word starts at any alphanumeric character that does not follow another one. Non-ASCII
/// letters count as word characters, so `naïve` stays one word.
///
/// ```
/// use foldex_engine::to_human_name;
///
/// assert_eq!(to_human_name("my_folder-name"), "My Folder Name");
/// assert_eq!(to_human_name(""), "");
/// ```
pub fn to_human_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut in_separator_run = false;
    let mut previous_is_word = false;
    for c in name.chars() {
        if c == '_' || c == '-' {
            if !in_separator_run {
                result.push(' ');
            }
            in_separator_run = true;
            previous_is_word = false;
            continue;
        }
        in_separator_run = false;
        let is_word = c.is_alphanumeric();
        if is_word && !previous_is_word {
            result.extend(c.to_uppercase());
        } else {
            result.push(c);
        }
        previous_is_word = is_word;
    }
    result
}

/// Strip the trailing extension: the last `.` and what follows, when that suffix is
/// non-empty. `archive.tar.gz` gives `archive.tar`, `.syncthing` gives the empty string.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => &name[..idx],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators_collapse_to_single_space() {
        assert_eq!(to_human_name("my_folder-name"), "My Folder Name");
        assert_eq!(to_human_name("a__--_b"), "A B");
        assert_eq!(to_human_name("-leading"), " Leading");
    }

    #[test]
    fn test_empty_and_already_capitalized() {
        assert_eq!(to_human_name(""), "");
        assert_eq!(to_human_name("already Capitalized"), "Already Capitalized");
    }

    #[test]
    fn test_word_boundaries() {
        assert_eq!(to_human_name("notes.backup"), "Notes.Backup");
        assert_eq!(to_human_name("2024 plan"), "2024 Plan");
        assert_eq!(to_human_name("x2y"), "X2y");
        assert_eq!(to_human_name("(conflicted copy)"), "(Conflicted Copy)");
    }

    #[test]
    fn test_non_ascii_words() {
        assert_eq!(to_human_name("élan_vital"), "Élan Vital");
        assert_eq!(to_human_name("über-notes"), "Über Notes");
        assert_eq!(to_human_name("naïve_idea"), "Naïve Idea");
        assert_eq!(to_human_name("ça.md"), "Ça.Md");
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("draft.md"), "draft");
        assert_eq!(strip_extension("archive.tar.gz"), "archive.tar");
        assert_eq!(strip_extension("Archive"), "Archive");
        assert_eq!(strip_extension(".syncthing"), "");
        assert_eq!(strip_extension("name."), "name.");
        assert_eq!(strip_extension(""), "");
    }
}
