//! Tuple store error types.

use thiserror::Error;

/// Tuple store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store not found.
    #[error("store not found: {store_id}")]
    StoreNotFound { store_id: String },

    /// Model not found.
    #[error("authorization model not found: {model_id}")]
    ModelNotFound { model_id: String },

    /// The model does not define the type.
    #[error("type not found in authorization model: {type_name}")]
    TypeNotFound { type_name: String },

    /// The model does not define the relation on the type.
    #[error("relation not found: {type_name}#{relation}")]
    RelationNotFound { type_name: String, relation: String },

    /// Invalid filter error.
    #[error("invalid filter: {message}")]
    InvalidFilter { message: String },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A condition could not be compiled or evaluated.
    #[error("condition '{name}' failed: {message}")]
    ConditionError { name: String, message: String },

    /// Graph traversal went deeper than the configured limit.
    #[error("depth limit exceeded (max: {max_depth})")]
    DepthLimitExceeded { max_depth: u32 },

    /// Internal error.
    #[error("internal store error: {message}")]
    InternalError { message: String },
}

/// Result type for tuple store operations.
pub type StoreResult<T> = Result<T, StoreError>;
