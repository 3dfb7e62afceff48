use crate::{
    config::ScanConfig,
    document::{Document, DocumentKind},
    error::{Error, Result},
    filter::FileFilter,
};
use ignore::{DirEntry, WalkBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Statistics collected during scanning.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    /// Markdown documents read
    pub markdown_files: usize,

    /// Notebook documents read
    pub notebook_files: usize,

    /// Files ignored because of their type or a filter rule
    pub skipped_files: usize,

    /// Files or directories that could not be read
    pub errors: usize,
}

impl ScanStats {
    /// Total documents read.
    #[must_use]
    pub const fn documents(&self) -> usize {
        self.markdown_files + self.notebook_files
    }
}

/// Walks the book and loads every markdown and notebook file.
pub(crate) struct Scanner {
    root_dir: PathBuf,
    include_dirs: Vec<PathBuf>,
    respect_gitignore: bool,
    file_filter: FileFilter,
    /// Canonical path of the macro list, when it already exists
    output_path: Option<PathBuf>,
}

impl Scanner {
    /// Creates a new scanner from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a filter glob is invalid.
    pub(crate) fn new(config: &ScanConfig) -> Result<Self> {
        Ok(Self {
            root_dir: config.root_dir.clone(),
            include_dirs: config.include_dirs.clone(),
            respect_gitignore: config.respect_gitignore,
            file_filter: FileFilter::new(&config.file_filter_config)?,
            output_path: config.output_path.canonicalize().ok(),
        })
    }

    /// Directories the walk starts from: the configured sub-directories, or
    /// the root itself.
    fn walk_roots(&self) -> Result<Vec<PathBuf>> {
        if self.include_dirs.is_empty() {
            return Ok(vec![self.root_dir.clone()]);
        }

        self.include_dirs
            .iter()
            .map(|dir| {
                let path = self.root_dir.join(dir);
                if path.is_dir() {
                    Ok(path)
                } else {
                    Err(Error::config(format!(
                        "Content directory does not exist: {}",
                        path.display()
                    )))
                }
            })
            .collect()
    }

    /// Scans the configured directories and returns the documents sorted by
    /// relative path.
    ///
    /// Unreadable entries are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured content directory is missing.
    pub(crate) fn scan(&self) -> Result<(Vec<Document>, ScanStats)> {
        let roots = self.walk_roots()?;
        let mut documents = Vec::new();
        let mut stats = ScanStats::default();

        for root in &roots {
            debug!("Walking {}", root.display());

            let walker = WalkBuilder::new(root)
                .git_ignore(self.respect_gitignore)
                .git_global(self.respect_gitignore)
                .git_exclude(self.respect_gitignore)
                .require_git(false)
                .hidden(true)
                .follow_links(false)
                .build();

            for result in walker {
                match result {
                    Ok(entry) if entry.file_type().is_some_and(|ft| ft.is_file()) => {
                        if let Some(document) = self.process_entry(&entry, &mut stats) {
                            documents.push(document);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Skipping unreadable entry: {}", e);
                        stats.errors += 1;
                    }
                }
            }
        }

        documents.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        documents.dedup_by(|a, b| a.absolute_path == b.absolute_path);

        debug!(
            "Scan complete: {} markdown, {} notebooks, {} skipped, {} errors",
            stats.markdown_files, stats.notebook_files, stats.skipped_files, stats.errors
        );

        if stats.errors > 0 {
            warn!("Encountered {} errors during scanning (non-fatal)", stats.errors);
        }

        Ok((documents, stats))
    }

    fn process_entry(&self, entry: &DirEntry, stats: &mut ScanStats) -> Option<Document> {
        let path = entry.path();

        if !self.file_filter.should_process(path) {
            trace!("Filtered out: {}", path.display());
            stats.skipped_files += 1;
            return None;
        }

        if self.is_output(path) {
            debug!("Skipping previous output: {}", path.display());
            stats.skipped_files += 1;
            return None;
        }

        let Some(kind) = DocumentKind::from_path(path) else {
            Self::log_ignored(path);
            stats.skipped_files += 1;
            return None;
        };

        match Document::load(path, &self.root_dir) {
            Ok(document) => {
                trace!("Loaded {} ({} lines)", document.relative_path, document.line_count());
                match kind {
                    DocumentKind::Markdown => stats.markdown_files += 1,
                    DocumentKind::Notebook => stats.notebook_files += 1,
                }
                Some(document)
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                stats.errors += 1;
                None
            }
        }
    }

    fn is_output(&self, path: &Path) -> bool {
        self.output_path
            .as_ref()
            .is_some_and(|output| path.canonicalize().is_ok_and(|p| &p == output))
    }

    fn log_ignored(path: &Path) {
        if path.extension().is_none() {
            trace!("Ignoring file without extension: {}", path.display());
        } else {
            debug!("Ignoring non-content file: {}", path.display());
        }
    }
}
