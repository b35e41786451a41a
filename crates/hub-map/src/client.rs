//! Collaborator contract for the mapping, modeling and document services.

use thiserror::Error;

use hub_model::{
    EntityDefinition, EvaluationResponse, MappingArtifact, MappingFunction, SourceDocument,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Services a mapping session talks to.
///
/// Implementations may be remote (HTTP) or local (files on disk); the
/// session only relies on this contract.
pub trait MappingClient {
    fn fetch_mapping_artifact(&self, name: &str) -> ClientResult<MappingArtifact>;

    fn update_mapping_artifact(&mut self, artifact: &MappingArtifact) -> ClientResult<()>;

    fn fetch_nested_entity_definitions(&self, entity_type: &str) -> ClientResult<EntityDefinition>;

    /// Document identifiers matching the step's source query, in display order.
    fn fetch_source_document_uris(&self, query: &str) -> ClientResult<Vec<String>>;

    fn fetch_source_document(&self, uri: &str) -> ClientResult<SourceDocument>;

    /// Evaluate every expression of `artifact` against the document at `uri`.
    fn evaluate_mapping_expression(
        &self,
        artifact: &MappingArtifact,
        uri: &str,
    ) -> ClientResult<EvaluationResponse>;

    fn list_mapping_functions(&self) -> ClientResult<Vec<MappingFunction>>;
}
