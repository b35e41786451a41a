//! A hub kept as plain files in one directory.
//!
//! ```text
//! <hub>/mappings/<name>.mapping.json
//! <hub>/entities/<entityType>.entity.json
//! <hub>/sources/*.json | *.xml
//! <hub>/functions.json      (optional)
//! <hub>/hub.json            (optional session options)
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use hub_ingest::{list_source_files, parse_document, read_document};
use hub_map::{ClientError, ClientResult, MappingClient, SessionOptions, evaluate_artifact};
use hub_model::{
    EntityDefinition, EvaluationResponse, MappingArtifact, MappingFunction, SourceDocument,
};

const MAPPINGS_DIR: &str = "mappings";
const ENTITIES_DIR: &str = "entities";
const SOURCES_DIR: &str = "sources";
const FUNCTIONS_FILE: &str = "functions.json";
const OPTIONS_FILE: &str = "hub.json";

#[derive(Debug, Clone)]
pub struct LocalHub {
    root: PathBuf,
}

impl LocalHub {
    pub fn open(root: impl Into<PathBuf>) -> ClientResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ClientError::NotFound(format!(
                "hub directory {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mapping_path(&self, name: &str) -> PathBuf {
        self.root
            .join(MAPPINGS_DIR)
            .join(format!("{name}.mapping.json"))
    }

    pub fn entity_path(&self, entity_type: &str) -> PathBuf {
        self.root
            .join(ENTITIES_DIR)
            .join(format!("{entity_type}.entity.json"))
    }

    fn sources_dir(&self) -> PathBuf {
        self.root.join(SOURCES_DIR)
    }

    /// Session options from `hub.json`; defaults when the file is absent.
    pub fn session_options(&self) -> ClientResult<SessionOptions> {
        let path = self.root.join(OPTIONS_FILE);
        if !path.is_file() {
            return Ok(SessionOptions::default());
        }
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Resolve a document uri to a file under `sources/`. Only bare file
    /// names are accepted.
    fn source_path(&self, uri: &str) -> ClientResult<PathBuf> {
        let file_name = Path::new(uri).file_name().and_then(|name| name.to_str());
        match file_name {
            Some(name) if name == uri => {
                let path = self.sources_dir().join(name);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(ClientError::NotFound(format!("source document {uri}")))
                }
            }
            _ => Err(ClientError::NotFound(format!("source document {uri}"))),
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> ClientResult<T> {
    let text = fs::read_to_string(path).map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => ClientError::NotFound(format!("{what} {}", path.display())),
        _ => ClientError::Io(error),
    })?;
    Ok(serde_json::from_str(&text)?)
}

impl MappingClient for LocalHub {
    fn fetch_mapping_artifact(&self, name: &str) -> ClientResult<MappingArtifact> {
        read_json(&self.mapping_path(name), "mapping")
    }

    fn update_mapping_artifact(&mut self, artifact: &MappingArtifact) -> ClientResult<()> {
        let path = self.mapping_path(&artifact.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(artifact)?;
        fs::write(&path, text)?;
        info!(path = %path.display(), "mapping saved");
        Ok(())
    }

    fn fetch_nested_entity_definitions(&self, entity_type: &str) -> ClientResult<EntityDefinition> {
        read_json(&self.entity_path(entity_type), "entity definition")
    }

    fn fetch_source_document_uris(&self, query: &str) -> ClientResult<Vec<String>> {
        if !query.is_empty() {
            debug!(query, "source query ignored; listing every local document");
        }
        let files = list_source_files(&self.sources_dir())
            .map_err(|error| ClientError::Request(error.to_string()))?;
        Ok(files
            .iter()
            .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
            .map(str::to_string)
            .collect())
    }

    fn fetch_source_document(&self, uri: &str) -> ClientResult<SourceDocument> {
        let path = self.source_path(uri)?;
        read_document(&path).map_err(|error| ClientError::Request(error.to_string()))
    }

    fn evaluate_mapping_expression(
        &self,
        artifact: &MappingArtifact,
        uri: &str,
    ) -> ClientResult<EvaluationResponse> {
        let document = self.fetch_source_document(uri)?;
        let tree =
            parse_document(&document).map_err(|error| ClientError::Request(error.to_string()))?;
        Ok(evaluate_artifact(&tree, artifact))
    }

    fn list_mapping_functions(&self) -> ClientResult<Vec<MappingFunction>> {
        let path = self.root.join(FUNCTIONS_FILE);
        if !path.is_file() {
            return Ok(Vec::new());
        }
        // accept either a bare list or an object keyed by function name
        match read_json::<Value>(&path, "functions")? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).map_err(ClientError::from))
                .collect(),
            Value::Object(map) => Ok(map
                .into_iter()
                .filter_map(|(name, value)| {
                    let signature = value
                        .get("signature")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    if signature.is_empty() {
                        warn!(function = %name, "function without signature skipped");
                        return None;
                    }
                    Some(MappingFunction {
                        function_name: name,
                        signature,
                        category: value
                            .get("category")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                    })
                })
                .collect()),
            other => Err(ClientError::Request(format!(
                "functions.json must hold a list or an object, found {other}"
            ))),
        }
    }
}
