use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("empty segment in path '{0}'")]
    EmptySegment(String),
    #[error("path '{0}' has a key that is neither a name nor node('...')")]
    InvalidSegment(String),
    #[error("invalid property path '{0}'")]
    InvalidPropertyPath(String),
    #[error("node {0} is not part of this tree")]
    UnknownNode(usize),
}

pub type Result<T> = std::result::Result<T, ModelError>;
