//! Error types for mapping operations.

use thiserror::Error;

use hub_ingest::IngestError;
use hub_model::{ModelError, NodeId, TableId};

use crate::client::ClientError;

/// A source selection could not be turned into a path. Nothing is written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("source node {0} not found in the current document")]
    NodeNotFound(NodeId),
    #[error("source context {0} not found in the current document")]
    ContextNotFound(NodeId),
    #[error("no source node at '{0}'")]
    PathNotFound(String),
    #[error("'{0}' is not a plain path expression")]
    NotAPath(String),
}

/// Errors from mapping operations.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("permission denied: {action} requires the {authority} authority")]
    PermissionDenied {
        action: &'static str,
        authority: &'static str,
    },

    #[error("unknown entity table: {0}")]
    UnknownTable(TableId),

    #[error("property '{property}' not found in table {table}")]
    UnknownProperty { table: TableId, property: String },

    #[error("table {0} has no source context row")]
    NoContextRow(TableId),

    #[error("no source document loaded")]
    NoDocument,

    #[error("saves still in flight; wait for them to settle before testing")]
    SavesPending,

    #[error("mapping service error: {0}")]
    Client(#[from] ClientError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, MappingError>;
