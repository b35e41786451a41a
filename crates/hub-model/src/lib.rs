pub mod authorities;
pub mod entity;
pub mod error;
pub mod mapping;
pub mod path;
pub mod source;

pub use authorities::Authorities;
pub use entity::{EntityDefinition, EntityProperty, RelatedEntityDefinition};
pub use error::{ModelError, Result};
pub use mapping::{
    EvaluatedOutput, EvaluationResponse, MappingArtifact, MappingFunction, PropertyEvaluation,
    PropertyMapping, PropertyPath, RelatedEntityEvaluation, RelatedEntityMapping, TableId,
};
pub use path::{PATH_SEPARATOR, SourcePath};
pub use source::{
    DocumentFormat, NodeId, SourceDocument, SourceNode, SourceTree, SourceValue,
};
