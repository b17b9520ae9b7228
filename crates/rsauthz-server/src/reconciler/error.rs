//! Reconciler error types.

use rsauthz_store::StoreError;
use thiserror::Error;

use super::source::{ObjectKind, SourceError};
use crate::error::AuthzError;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The namespace store could not be resolved.
    #[error(transparent)]
    Authz(#[from] AuthzError),

    /// Reading current tuples failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Namespaces could not be enumerated from the object source.
    #[error("failed to enumerate namespaces: {0}")]
    Enumerate(#[source] SourceError),

    /// Objects of one kind could not be listed.
    #[error("failed to list {kind}: {message}")]
    Source { kind: ObjectKind, message: String },

    /// An object of one kind could not be translated.
    #[error("failed to translate {kind} '{name}': {message}")]
    Translate {
        kind: ObjectKind,
        name: String,
        message: String,
    },

    /// Some write batches failed; the rest were applied.
    #[error("{failed} of {total} write batches failed")]
    BatchesFailed { failed: usize, total: usize },

    #[error("{} errors during reconcile", .0.len())]
    Aggregate(Vec<ReconcileError>),
}

impl ReconcileError {
    /// Collapses collected errors into one, or `None` when there are none.
    pub fn collect(mut errors: Vec<ReconcileError>) -> Option<ReconcileError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(ReconcileError::Aggregate(errors)),
        }
    }
}
