//! Error types crossing component boundaries. OS backends use [anyhow] internally, everything a
//! caller can react to is typed here.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::record::Category;

/// Raised when a collector can't be built for the running platform.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Data collection is not supported on {0}")]
    UnsupportedPlatform(String),
}

/// A sub-source that failed during best-effort collection. These never reach the caller as
/// errors, they are logged and counted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{category} sub-source '{sub_source}' failed: {message}")]
pub struct SourceFailure {
    pub category: Category,
    pub sub_source: &'static str,
    pub message: String,
}

/// Malformed user input. Caught at the CLI boundary, the core assumes validated input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid {flag} format: {value}. Use YYYY-MM-DD format (e.g., 2024-01-31)")]
    InvalidDate { flag: &'static str, value: String },
    #[error("Start date must be before end date")]
    StartAfterEnd,
    #[error("No data types selected for collection. Use --logins-only, --files-only, --apps-only, or remove --no-* flags")]
    EmptySelection,
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to encode report page: {0}")]
    Encode(#[from] lopdf::Error),
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] io::Error),
    #[error("Failed to write report to {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to write metadata to {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to read metadata from {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Metadata in {path:?} is malformed: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),
}
