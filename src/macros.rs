use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Tokens the walker reports that are almost never real macros: escaped
/// braces and ampersands, LaTeX line breaks, and `\t` / `\n` escapes that leak
/// in from strings quoted in notebooks.
pub static DEFAULT_DENYLIST: Lazy<BTreeSet<String>> = Lazy::new(|| {
    ["\\{", "\\}", "\\&", "\\\\", "\\t", "\\n"]
        .into_iter()
        .map(String::from)
        .collect()
});

/// Deduplicated set of macro tokens.
///
/// Iteration is sorted so the persisted list is identical between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroSet {
    macros: BTreeSet<String>,
}

impl MacroSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token. Returns true if it was not present yet.
    pub fn insert(&mut self, token: impl Into<String>) -> bool {
        self.macros.insert(token.into())
    }

    /// Number of distinct tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    /// Returns true if the set holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Returns true if `token` is in the set.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.macros.contains(token)
    }

    /// Iterates over the tokens in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.macros.iter().map(String::as_str)
    }

    /// Drops parsing artifacts: blank tokens, a lone backslash, and anything
    /// in `denylist`. Returns the number of tokens removed.
    ///
    /// This is a heuristic. A genuine `\t` (tie accent) is dropped with the
    /// default denylist, and escaped markdown punctuation such as `\_` or `\*`
    /// is kept.
    pub fn clean(&mut self, denylist: &BTreeSet<String>) -> usize {
        let before = self.macros.len();
        self.macros.retain(|token| {
            let token = token.trim();
            !token.is_empty() && token != "\\" && !denylist.contains(token)
        });
        before - self.macros.len()
    }

    /// Renders the list file content: one token per line.
    #[must_use]
    pub fn to_list_string(&self) -> String {
        let mut out = String::with_capacity(self.macros.iter().map(|m| m.len() + 1).sum());
        for token in &self.macros {
            out.push_str(token);
            out.push('\n');
        }
        out
    }

    /// Parses list file content. Surrounding whitespace is trimmed and blank
    /// lines are ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Reads a list file written by the scanner.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
        Ok(Self::parse(&text))
    }
}

impl<S: Into<String>> FromIterator<S> for MacroSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            macros: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for MacroSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.macros.extend(iter.into_iter().map(Into::into));
    }
}

impl<'a> IntoIterator for &'a MacroSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.macros.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_deduplicates() {
        let mut set = MacroSet::new();
        assert!(set.insert("\\alpha"));
        assert!(!set.insert("\\alpha"));
        set.extend(["\\beta", "\\alpha"]);

        assert_eq!(set.len(), 2);
        assert!(set.contains("\\alpha"));
        assert!(set.contains("\\beta"));
    }

    #[test]
    fn test_clean_default_denylist() {
        let mut set: MacroSet = ["\\alpha", "\\{", "\\}", "\\&", "\\\\", "\\t", "\\n", "\\", " ", "\\,"]
            .into_iter()
            .collect();

        let removed = set.clean(&DEFAULT_DENYLIST);

        assert_eq!(removed, 8);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["\\,", "\\alpha"]);
    }

    #[test]
    fn test_clean_custom_denylist() {
        let mut set: MacroSet = ["\\alpha", "\\_"].into_iter().collect();
        let denylist: BTreeSet<String> = ["\\_".to_string()].into_iter().collect();

        set.clean(&denylist);

        assert!(set.contains("\\alpha"));
        assert!(!set.contains("\\_"));
    }

    #[test]
    fn test_list_string_is_sorted() {
        let set: MacroSet = ["\\ge", "\\alpha", "\\beta"].into_iter().collect();
        assert_eq!(set.to_list_string(), "\\alpha\n\\beta\n\\ge\n");
    }

    #[test]
    fn test_empty_list_string() {
        assert_eq!(MacroSet::new().to_list_string(), "");
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let set = MacroSet::parse("\\alpha\n\n  \\beta  \r\n\n");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["\\alpha", "\\beta"]);
    }

    #[test]
    fn test_load_from_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("macros_used.txt");
        file.write_str("\\alpha\n\\beta\n").unwrap();

        let set = MacroSet::load(file.path()).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = MacroSet::load(Path::new("/nonexistent/macros_used.txt")).unwrap_err();
        assert!(err.is_io());
    }
}
