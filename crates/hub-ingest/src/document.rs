//! Format detection and document loading.

use std::path::{Path, PathBuf};

use tracing::{debug, info_span};

use hub_model::{DocumentFormat, SourceDocument, SourceTree};

use crate::error::{IngestError, Result};
use crate::json::parse_json;
use crate::xml::parse_xml;

/// Guess the format from the first significant character of the content.
pub fn detect_format(content: &str) -> Option<DocumentFormat> {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    match trimmed.chars().next()? {
        '<' => Some(DocumentFormat::Xml),
        '{' | '[' => Some(DocumentFormat::Json),
        _ => None,
    }
}

/// Format implied by a file extension (`.json` or `.xml`, case-insensitive).
pub fn format_from_extension(path: &Path) -> Option<DocumentFormat> {
    let ext = path.extension()?.to_str()?;
    if ext.eq_ignore_ascii_case("json") {
        Some(DocumentFormat::Json)
    } else if ext.eq_ignore_ascii_case("xml") {
        Some(DocumentFormat::Xml)
    } else {
        None
    }
}

/// Parse a fetched document, detecting its format from the content.
pub fn parse_document(document: &SourceDocument) -> Result<SourceTree> {
    let span = info_span!("parse_document", uri = %document.uri);
    let _guard = span.enter();
    if document.content.trim().is_empty() {
        return Err(IngestError::EmptyDocument {
            uri: document.uri.clone(),
        });
    }
    let format = detect_format(&document.content).ok_or_else(|| IngestError::UnknownFormat {
        uri: document.uri.clone(),
    })?;
    debug!(%format, "detected document format");
    let content = document.content.trim_start_matches('\u{feff}');
    match format {
        DocumentFormat::Json => parse_json(content),
        DocumentFormat::Xml => parse_xml(content),
    }
}

/// Read a document from disk; its URI is the file name.
pub fn read_document(path: &Path) -> Result<SourceDocument> {
    let content = std::fs::read_to_string(path).map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let uri = path
        .file_name()
        .and_then(|name| name.to_str())
        .map_or_else(|| path.display().to_string(), str::to_string);
    Ok(SourceDocument { uri, content })
}

/// Read and parse a document from disk.
pub fn load_document(path: &Path) -> Result<(SourceDocument, SourceTree)> {
    let document = read_document(path)?;
    let tree = parse_document(&document)?;
    Ok((document, tree))
}

/// Lists all JSON and XML files in a directory.
///
/// Returns files sorted by filename.
pub fn list_source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() && format_from_extension(&path).is_some() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
