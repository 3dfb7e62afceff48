use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the texref library.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Invalid UTF-8 encountered in a document.
    #[error("Invalid UTF-8 encoding in file '{path}'. File may be binary or use unsupported encoding.")]
    InvalidUtf8 {
        /// Path to file with encoding issues
        path: PathBuf,
    },

    /// Notebook file could not be parsed.
    #[error("Failed to parse notebook '{path}': {message}")]
    Notebook {
        /// Path to the notebook
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// Prompt template error.
    #[error("Failed to render template '{template}': {message}")]
    Template {
        /// Template name or path
        template: String,
        /// Error message
        message: String,
    },

    /// API credential missing or malformed.
    #[error("Credential error: {message}")]
    Credential {
        /// Detailed error message
        message: String,
    },

    /// The remote text-generation service failed.
    #[error("Remote service error{}: {message}", http_status(.status))]
    Remote {
        /// HTTP status, when a response was received
        status: Option<u16>,
        /// Error message
        message: String,
    },

    /// The macro list handed to the generator contains no macros.
    #[error("Macro list '{path}' is empty. Run `texref scan` first.")]
    EmptyMacroList {
        /// Path to the macro list file
        path: PathBuf,
    },

    /// JSON serialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// System time error.
    #[error("System time error: {message}")]
    SystemTime {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Maps a read error, reporting decoding failures as [`Error::InvalidUtf8`].
    #[must_use]
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::InvalidData {
            Self::InvalidUtf8 { path: path.into() }
        } else {
            Self::io(path, source)
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a template error.
    #[must_use]
    pub fn template(template: impl Into<String>, message: impl ToString) -> Self {
        Self::Template {
            template: template.into(),
            message: message.to_string(),
        }
    }

    /// Creates a notebook parse error.
    #[must_use]
    pub fn notebook(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Notebook {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a credential error.
    #[must_use]
    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential {
            message: message.into(),
        }
    }

    /// Creates a remote service error.
    #[must_use]
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Creates an empty macro list error.
    #[must_use]
    pub fn empty_macro_list(path: impl Into<PathBuf>) -> Self {
        Self::EmptyMacroList { path: path.into() }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns true if this is a credential error.
    #[must_use]
    pub const fn is_credential(&self) -> bool {
        matches!(self, Self::Credential { .. })
    }

    /// Returns true if this is a remote service error.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

fn http_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl From<std::time::SystemTimeError> for Error {
    fn from(e: std::time::SystemTimeError) -> Self {
        Self::SystemTime {
            message: e.to_string(),
        }
    }
}

impl From<tera::Error> for Error {
    fn from(e: tera::Error) -> Self {
        Self::Template {
            template: "unknown".to_string(),
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Remote {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}
