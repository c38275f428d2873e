use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Acquisition errors (archive cache)
// ---------------------------------------------------------------------------

/// Failure to make a dataset available on local disk.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// The remote archive could not be retrieved.
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The archive could not be decompressed, or holds no file with the expected name.
    #[error("corrupt archive {}: {reason}", .path.display())]
    CorruptArchive { path: PathBuf, reason: String },

    /// Local filesystem failure inside the cache directory.
    #[error("cache I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AcquireError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AcquireError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        AcquireError::CorruptArchive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Load errors (dataset store)
// ---------------------------------------------------------------------------

/// Fatal failure to turn a tabular file into a record set.
#[derive(Debug, Error)]
pub enum LoadError {
    /// One or more required columns are absent from the header.
    #[error("dataset is missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    /// The file could not be opened or its container format is unreadable.
    #[error("failed to read {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },
}

/// A single malformed row. Rows with parse errors are skipped, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("row {row}{}: {message}", .column.as_ref().map(|c| format!(" ({c})")).unwrap_or_default())]
pub struct ParseError {
    /// Zero-based data row (header excluded).
    pub row: usize,
    pub column: Option<String>,
    pub message: String,
}

impl ParseError {
    pub fn new(row: usize, column: Option<&str>, message: impl Into<String>) -> Self {
        ParseError {
            row,
            column: column.map(str::to_string),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Acquisition + load. Any of these means no view can be produced.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("dataset unavailable: {0}")]
    Acquire(#[from] AcquireError),

    #[error("dataset unavailable: {0}")]
    Load(#[from] LoadError),
}
