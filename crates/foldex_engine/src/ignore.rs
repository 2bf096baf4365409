use regex::Regex;
use tracing::warn;

/// Compiled ignore patterns from the comma-separated settings value.
///
/// Each entry is compiled exactly as written, surrounding spaces included. Entries that
/// are not valid regular expressions are logged and skipped, the remaining ones still
/// apply. Empty entries are dropped, so an empty settings value ignores nothing.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    patterns: Vec<Regex>,
}

impl IgnoreRules {
    pub fn parse(raw: &str) -> Self {
        let mut patterns = Vec::new();
        for entry in raw.split(',').filter(|entry| !entry.is_empty()) {
            match Regex::new(entry) {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => warn!(pattern = %entry, error = %e, "skipping invalid ignore pattern"),
            }
        }
        Self { patterns }
    }

    /// True if any pattern matches somewhere in the bare name.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(name))
    }
}
