//! Declarative object sources.
//!
//! The reconciler reads the objects tuples are derived from through
//! [`ObjectSource`]. Objects are raw JSON documents; each kind's
//! translator picks the fields it needs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Kinds of declarative objects that map to tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Folders,
    Roles,
    RoleBindings,
    ResourcePermissions,
    TeamBindings,
    Users,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 6] = [
        ObjectKind::Folders,
        ObjectKind::Roles,
        ObjectKind::RoleBindings,
        ObjectKind::ResourcePermissions,
        ObjectKind::TeamBindings,
        ObjectKind::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Folders => "folders",
            ObjectKind::Roles => "roles",
            ObjectKind::RoleBindings => "rolebindings",
            ObjectKind::ResourcePermissions => "resourcepermissions",
            ObjectKind::TeamBindings => "teambindings",
            ObjectKind::Users => "users",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub items: Vec<Value>,
    /// Token for the next page; `None` when exhausted.
    pub continue_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to load objects from {path}: {message}")]
    Snapshot { path: String, message: String },

    #[error("invalid continue token: {token}")]
    InvalidToken { token: String },

    #[error("object source unavailable: {message}")]
    Unavailable { message: String },
}

/// Paginated access to declarative objects per namespace.
#[async_trait]
pub trait ObjectSource: Send + Sync + 'static {
    /// Lists objects of `kind` in `namespace`, at most `limit` per page.
    async fn list(
        &self,
        namespace: &str,
        kind: ObjectKind,
        limit: u32,
        continue_token: Option<String>,
    ) -> Result<ObjectPage, SourceError>;

    /// Namespaces the source knows objects for.
    async fn namespaces(&self) -> Result<Vec<String>, SourceError> {
        Ok(Vec::new())
    }
}

/// Object source backed by a concurrent in-memory map.
#[derive(Debug, Default)]
pub struct MemoryObjectSource {
    objects: DashMap<(String, ObjectKind), Vec<Value>>,
}

/// On-disk snapshot layout: `{namespace: {kind: [object, ...]}}`.
type Snapshot = BTreeMap<String, BTreeMap<ObjectKind, Vec<Value>>>;

impl MemoryObjectSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON snapshot of objects per namespace.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let snapshot_error = |message: String| SourceError::Snapshot {
            path: path.display().to_string(),
            message,
        };
        let contents = std::fs::read_to_string(path).map_err(|e| snapshot_error(e.to_string()))?;
        let snapshot: Snapshot =
            serde_json::from_str(&contents).map_err(|e| snapshot_error(e.to_string()))?;

        let source = Self::new();
        for (namespace, kinds) in snapshot {
            for (kind, objects) in kinds {
                source.set(&namespace, kind, objects);
            }
        }
        Ok(source)
    }

    /// Replaces all objects of `kind` in `namespace`.
    pub fn set(&self, namespace: &str, kind: ObjectKind, objects: Vec<Value>) {
        self.objects.insert((namespace.to_string(), kind), objects);
    }

    pub fn insert(&self, namespace: &str, kind: ObjectKind, object: Value) {
        self.objects
            .entry((namespace.to_string(), kind))
            .or_default()
            .push(object);
    }
}

#[async_trait]
impl ObjectSource for MemoryObjectSource {
    async fn list(
        &self,
        namespace: &str,
        kind: ObjectKind,
        limit: u32,
        continue_token: Option<String>,
    ) -> Result<ObjectPage, SourceError> {
        let offset = match continue_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| SourceError::InvalidToken { token })?,
        };
        let Some(objects) = self.objects.get(&(namespace.to_string(), kind)) else {
            return Ok(ObjectPage::default());
        };

        let limit = limit.max(1) as usize;
        let items: Vec<Value> = objects.iter().skip(offset).take(limit).cloned().collect();
        let next = offset + items.len();
        Ok(ObjectPage {
            items,
            continue_token: (next < objects.len()).then(|| next.to_string()),
        })
    }

    async fn namespaces(&self) -> Result<Vec<String>, SourceError> {
        let namespaces: BTreeSet<String> = self
            .objects
            .iter()
            .map(|entry| entry.key().0.clone())
            .collect();
        Ok(namespaces.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_list_paginates() {
        let source = MemoryObjectSource::new();
        for i in 0..5 {
            source.insert("org", ObjectKind::Folders, json!({"metadata": {"name": i}}));
        }

        let mut token = None;
        let mut seen = 0;
        loop {
            let page = source
                .list("org", ObjectKind::Folders, 2, token)
                .await
                .unwrap();
            seen += page.items.len();
            token = page.continue_token;
            if token.is_none() {
                break;
            }
        }
        assert_eq!(seen, 5);
    }

    #[tokio::test]
    async fn test_unknown_namespace_is_empty() {
        let source = MemoryObjectSource::new();
        let page = source
            .list("missing", ObjectKind::Users, 10, None)
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(page.continue_token.is_none());
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected() {
        let source = MemoryObjectSource::new();
        let result = source
            .list("org", ObjectKind::Users, 10, Some("abc".to_string()))
            .await;
        assert!(matches!(result, Err(SourceError::InvalidToken { .. })));
    }

    #[tokio::test]
    async fn test_load_snapshot_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "org-1": {{"users": [{{"metadata": {{"name": "u1"}}, "spec": {{"role": "Viewer"}}}}]}},
                "org-2": {{"folders": [], "rolebindings": []}}
            }}"#
        )
        .unwrap();

        let source = MemoryObjectSource::from_json_file(file.path()).unwrap();

        assert_eq!(
            source.namespaces().await.unwrap(),
            vec!["org-1".to_string(), "org-2".to_string()]
        );
        let users = source
            .list("org-1", ObjectKind::Users, 10, None)
            .await
            .unwrap();
        assert_eq!(users.items.len(), 1);
    }

    #[test]
    fn test_missing_snapshot_file() {
        let result = MemoryObjectSource::from_json_file("/nonexistent/objects.json");
        assert!(matches!(result, Err(SourceError::Snapshot { .. })));
    }
}
