//! Error kinds raised by the feature pipeline.
//!
//! The application and CLI layers wrap these in `anyhow` with file-level
//! context; everything below them returns a `FeatureResult`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("malformed annotation for document '{id}': {reason}")]
    MalformedAnnotation { id: String, reason: String },

    #[error("no qualifying values: {0}")]
    EmptyInput(String),

    #[error("document '{0}' has no token rows")]
    EmptyDocument(String),

    #[error("schema mismatch: missing columns {missing:?}, unexpected columns {unexpected:?}")]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("no target row for document '{0}'")]
    MissingTarget(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for feature pipeline operations
pub type FeatureResult<T> = Result<T, FeatureError>;
