//! Source document ingestion.
//!
//! This crate turns raw JSON or XML content into the uniform
//! [`SourceTree`](hub_model::SourceTree) used for mapping.
//!
//! # Example
//!
//! ```ignore
//! use hub_ingest::parse_document;
//! use hub_model::SourceDocument;
//!
//! let document = SourceDocument {
//!     uri: "/dummy/uri/person-101.json".into(),
//!     content: r#"{"proteinId": "123EAC"}"#.into(),
//! };
//! let tree = parse_document(&document)?;
//! ```

mod document;
mod error;
mod json;
mod xml;

// === Error Types ===
pub use error::{IngestError, Result};

// === Parsing ===
pub use json::parse_json;
pub use xml::parse_xml;

// === Documents ===
pub use document::{
    detect_format, format_from_extension, list_source_files, load_document, parse_document,
    read_document,
};
