//! Glob-based file selection for the scanner.

use crate::config::{DEFAULT_OUTPUT_PATTERN, pattern_glob};
use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Build output and notebook checkpoints duplicate the book's sources.
const DEFAULT_EXCLUDED_DIRECTORIES: &[&str] = &["**/_build", "**/.ipynb_checkpoints"];

/// Configuration for file filtering with glob patterns.
///
/// Allows selective file and directory inclusion/exclusion during scanning.
#[derive(Debug, Clone)]
pub struct FileFilterConfig {
    exclude_files: Vec<String>,
    exclude_all_files_except: Vec<String>,
    exclude_directories: Vec<String>,
}

impl Default for FileFilterConfig {
    fn default() -> Self {
        Self {
            exclude_files: vec![pattern_glob(DEFAULT_OUTPUT_PATTERN)],
            exclude_all_files_except: Vec::new(),
            exclude_directories: DEFAULT_EXCLUDED_DIRECTORIES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl FileFilterConfig {
    /// Creates a configuration that excludes the Jupyter Book build directories
    /// and references written with the default output pattern.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds files to the blacklist, keeping the defaults.
    #[must_use]
    pub fn exclude_files(mut self, patterns: Vec<String>) -> Self {
        self.exclude_files.extend(patterns);
        self
    }

    /// Skips files a reference output pattern can produce, e.g.
    /// `notes/ref_{model}.md`. Generated references quote macros the book
    /// never uses.
    #[must_use]
    pub fn exclude_output_pattern(mut self, pattern: &str) -> Self {
        self.exclude_files.push(pattern_glob(pattern));
        self
    }

    /// Adds directories to the blacklist, keeping the defaults.
    #[must_use]
    pub fn exclude_directories(mut self, patterns: Vec<String>) -> Self {
        self.exclude_directories.extend(patterns);
        self
    }

    /// Sets the file whitelist.
    #[must_use]
    pub fn allow_only(mut self, patterns: Vec<String>) -> Self {
        self.exclude_all_files_except = patterns;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FileFilter {
    exclude_files: GlobSet,
    include_files: Option<GlobSet>,
    exclude_directories: GlobSet,
}

impl FileFilter {
    /// Compiles the glob patterns of `config`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a pattern is not a valid glob.
    pub(crate) fn new(config: &FileFilterConfig) -> Result<Self> {
        let exclude_files = Self::build_globset(&config.exclude_files)?;
        let exclude_directories = Self::build_globset(&config.exclude_directories)?;

        let include_files = if config.exclude_all_files_except.is_empty() {
            None
        } else {
            Some(Self::build_globset(&config.exclude_all_files_except)?)
        };

        Ok(Self {
            exclude_files,
            include_files,
            exclude_directories,
        })
    }

    fn build_globset(patterns: &[String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| Error::config(format!("Invalid glob pattern '{pattern}': {e}")))?;
            builder.add(glob);
        }

        builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build glob set: {e}")))
    }

    pub(crate) fn should_process(&self, path: &Path) -> bool {
        if let Some(ref include) = self.include_files {
            if !include.is_match(path) {
                return false;
            }
        }

        if path
            .ancestors()
            .any(|ancestor| self.exclude_directories.is_match(ancestor))
        {
            return false;
        }

        !self.exclude_files.is_match(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_excludes_build_output() {
        let filter = FileFilter::new(&FileFilterConfig::default()).unwrap();

        assert!(filter.should_process(Path::new("book/unit1/intro.md")));
        assert!(!filter.should_process(Path::new("book/_build/html/intro.md")));
        assert!(!filter.should_process(Path::new(
            "book/unit2/.ipynb_checkpoints/lecture-checkpoint.ipynb"
        )));
    }

    #[test]
    fn test_default_excludes_generated_reference() {
        let filter = FileFilter::new(&FileFilterConfig::default()).unwrap();

        assert!(!filter.should_process(Path::new(
            "/home/me/book/latex_reference_gpt-4_2026-10-16_10-00.md"
        )));
        assert!(!filter.should_process(Path::new("latex_reference_gpt-4o_2026-01-02_08-30.md")));
        assert!(filter.should_process(Path::new("book/latex_primer.md")));
    }

    #[test]
    fn test_exclude_output_pattern() {
        let config = FileFilterConfig::new()
            .exclude_files(vec!["**/README.md".to_string()])
            .exclude_output_pattern("notes/ref_{model}.md");
        let filter = FileFilter::new(&config).unwrap();

        assert!(!filter.should_process(Path::new("book/notes/ref_gpt-4.md")));
        assert!(!filter.should_process(Path::new("book/README.md")));
        assert!(!filter.should_process(Path::new("book/latex_reference_gpt-4_2026-10-16_10-00.md")));
        assert!(filter.should_process(Path::new("book/notes/lecture.md")));
    }

    #[test]
    fn test_exclude_directories_keeps_defaults() {
        let config = FileFilterConfig::new().exclude_directories(vec!["**/drafts".to_string()]);
        let filter = FileFilter::new(&config).unwrap();

        assert!(!filter.should_process(Path::new("book/drafts/todo.md")));
        assert!(!filter.should_process(Path::new("book/_build/intro.md")));
        assert!(filter.should_process(Path::new("book/unit1/intro.md")));
    }

    #[test]
    fn test_exclude_files() {
        let config = FileFilterConfig::new().exclude_files(vec!["**/README.md".to_string()]);
        let filter = FileFilter::new(&config).unwrap();

        assert!(!filter.should_process(Path::new("book/README.md")));
        assert!(filter.should_process(Path::new("book/intro.md")));
    }

    #[test]
    fn test_allow_only() {
        let config = FileFilterConfig::new().allow_only(vec!["**/unit*/**".to_string()]);
        let filter = FileFilter::new(&config).unwrap();

        assert!(filter.should_process(Path::new("book/unit3/mcmc.ipynb")));
        assert!(!filter.should_process(Path::new("book/backmatter/refs.md")));
    }

    #[test]
    fn test_invalid_pattern() {
        let config = FileFilterConfig::new().exclude_files(vec!["[unclosed".to_string()]);
        let err = FileFilter::new(&config).unwrap_err();
        assert!(err.is_config());
    }
}
