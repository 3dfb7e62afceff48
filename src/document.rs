use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Source format of a scanned document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Markdown file (`.md`)
    Markdown,
    /// Jupyter notebook (`.ipynb`)
    Notebook,
}

impl DocumentKind {
    /// Determines the document kind from the file extension.
    ///
    /// Returns `None` for anything that is not `.md` or `.ipynb`.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        [Self::Markdown, Self::Notebook]
            .into_iter()
            .find(|kind| kind.extension() == ext)
    }

    /// Returns the file extension for this kind.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Notebook => "ipynb",
        }
    }
}

/// A markdown or notebook file with the text that will be scanned for macros.
#[derive(Debug, Clone)]
pub struct Document {
    /// Absolute path to the file
    pub absolute_path: PathBuf,

    /// Relative path from the scan root
    pub relative_path: String,

    /// Source format
    pub kind: DocumentKind,

    /// Independently rendered blocks of text: the whole file for markdown,
    /// one entry per markdown or raw cell for notebooks
    pub segments: Vec<String>,
}

impl Document {
    /// Creates a document from already extracted segments.
    #[must_use]
    pub fn new(
        absolute_path: PathBuf,
        relative_path: String,
        kind: DocumentKind,
        segments: Vec<String>,
    ) -> Self {
        Self {
            absolute_path,
            relative_path,
            kind,
            segments,
        }
    }

    /// Reads a document from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The extension is not `.md` or `.ipynb`
    /// - The file cannot be read or is not valid UTF-8
    /// - A notebook is not valid nbformat JSON
    pub fn load(path: &Path, root: &Path) -> Result<Self> {
        let kind = DocumentKind::from_path(path).ok_or_else(|| {
            Error::config(format!("Unsupported document type: {}", path.display()))
        })?;

        let raw = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;

        let segments = match kind {
            DocumentKind::Markdown => vec![raw],
            DocumentKind::Notebook => {
                notebook_cells(&raw).map_err(|e| Error::notebook(path, e.to_string()))?
            }
        };

        let relative_path = pathdiff::diff_paths(path, root)
            .unwrap_or_else(|| path.to_path_buf())
            .to_string_lossy()
            .to_string();

        Ok(Self::new(path.to_path_buf(), relative_path, kind, segments))
    }

    /// Returns the number of lines of scanned text.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.segments.iter().map(|segment| segment.lines().count()).sum()
    }
}

#[derive(Debug, Deserialize)]
struct Notebook {
    #[serde(default)]
    cells: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    cell_type: String,
    #[serde(default)]
    source: CellSource,
}

/// nbformat 4 allows a cell source to be either one string or a list of lines.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum CellSource {
    Text(String),
    Lines(Vec<String>),
    #[default]
    Missing,
}

impl CellSource {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Lines(lines) => lines.concat(),
            Self::Missing => String::new(),
        }
    }
}

/// Extracts the text of the markdown and raw cells of a notebook, one
/// entry per cell.
///
/// Code cells are dropped. Cells stay separate because each one renders on
/// its own: an unclosed fence never reaches into the next cell.
pub(crate) fn notebook_cells(json: &str) -> std::result::Result<Vec<String>, serde_json::Error> {
    let notebook: Notebook = serde_json::from_str(json)?;

    Ok(notebook
        .cells
        .into_iter()
        .filter(|cell| matches!(cell.cell_type.as_str(), "markdown" | "raw"))
        .map(|cell| cell.source.into_text())
        .collect())
}
