//! Authorization server error types.
//!
//! A check that resolves to "not allowed" is `Ok(false)`, never an error.
//! The variants here are for questions that could not be answered.

use rsauthz_common::CommonError;
use rsauthz_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    /// The caller may not ask this question at all.
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    /// The request is malformed.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The tuple store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An operation could not be translated to tuples.
    #[error("translation failed: {message}")]
    Translation { message: String },
}

impl AuthzError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }
}

impl From<CommonError> for AuthzError {
    fn from(err: CommonError) -> Self {
        Self::InvalidArgument {
            message: err.to_string(),
        }
    }
}

/// Result type for authorization server operations.
pub type AuthzResult<T> = Result<T, AuthzError>;
