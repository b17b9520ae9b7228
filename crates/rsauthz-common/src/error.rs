//! Error types for identifier and tuple construction.

use thiserror::Error;

/// Errors raised while parsing or building identifiers and tuples.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommonError {
    /// Identifier is not in `type:id[#relation]` form.
    #[error("invalid identifier '{value}': {message}")]
    InvalidIdentifier { value: String, message: String },

    /// A name contains a reserved tuple-syntax character.
    #[error("invalid name '{value}': must not contain '#' or ':'")]
    ReservedCharacter { value: String },

    /// Verb has no relation mapping.
    #[error("unknown verb: {verb}")]
    UnknownVerb { verb: String },

    /// Subject kind is not one of the supported kinds.
    #[error("unknown subject kind: {kind}")]
    UnknownSubjectKind { kind: String },

    /// Team permission is neither `member` nor `admin`.
    #[error("unknown team permission: {permission}")]
    UnknownTeamPermission { permission: String },
}

/// Result type for common operations.
pub type CommonResult<T> = Result<T, CommonError>;
