//! Error types for source document ingestion.

use std::path::PathBuf;
use thiserror::Error;

use hub_model::ModelError;

/// Errors that can occur while loading and parsing source documents.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Directory not found or not readable.
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Parsing Errors ===
    /// Content is neither JSON nor XML.
    #[error("unrecognized document format for {uri}")]
    UnknownFormat { uri: String },

    /// Document is empty.
    #[error("document is empty: {uri}")]
    EmptyDocument { uri: String },

    /// Invalid JSON content.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON document root is not an object.
    #[error("JSON document root must be an object, found {found}")]
    UnsupportedJsonRoot { found: &'static str },

    /// Invalid XML content.
    #[error("invalid XML: {message}")]
    Xml { message: String },

    /// Tree construction failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl From<quick_xml::Error> for IngestError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml {
            message: err.to_string(),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
