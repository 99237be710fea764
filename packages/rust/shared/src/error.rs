//! Error types for hazfill.
//!
//! Library crates use [`HazfillError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all hazfill operations.
#[derive(Debug, thiserror::Error)]
pub enum HazfillError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level HTTP error talking to a search or LLM backend.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed payload from a backend or a config file.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A record carried a field outside the HMIS schema.
    #[error("schema error: {message}")]
    Schema { message: String },

    /// The search capability failed.
    #[error("search error: {0}")]
    Search(String),

    /// The extraction (LLM) capability failed.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Reading or writing a table failed.
    #[error("table error: {0}")]
    Table(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad argument, inconsistent catalog, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HazfillError>;

impl HazfillError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a schema error from any displayable message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = HazfillError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = HazfillError::schema("unknown field `colour`");
        assert!(err.to_string().starts_with("schema error:"));
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn io_error_carries_path() {
        let err = HazfillError::io(
            "/tmp/missing.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("missing.csv"));
    }
}
