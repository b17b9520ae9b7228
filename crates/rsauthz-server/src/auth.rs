//! Caller authentication against the requested namespace.

use crate::error::{AuthzError, AuthzResult};

/// Namespace claim that matches every namespace.
pub const ANY_NAMESPACE: &str = "*";

/// Identity of the service calling the authorization API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthInfo {
    /// Namespace the caller is allowed to act in.
    pub namespace: String,
    /// Permissions granted to the caller, e.g. the write permission.
    pub permissions: Vec<String>,
}

impl AuthInfo {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            permissions: Vec::new(),
        }
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Rejects requests for a namespace the caller has no claim on.
    pub fn authorize_namespace(&self, namespace: &str) -> AuthzResult<()> {
        if namespace.is_empty() {
            return Err(AuthzError::invalid("namespace is required"));
        }
        if self.namespace == ANY_NAMESPACE || self.namespace == namespace {
            return Ok(());
        }
        Err(AuthzError::denied(format!(
            "caller namespace '{}' does not match requested namespace '{namespace}'",
            self.namespace
        )))
    }

    /// Namespace check plus the explicit write permission.
    pub fn authorize_write(&self, namespace: &str, write_permission: &str) -> AuthzResult<()> {
        self.authorize_namespace(namespace)?;
        if !self.has_permission(write_permission) {
            return Err(AuthzError::denied(format!(
                "missing '{write_permission}' permission"
            )));
        }
        Ok(())
    }
}
