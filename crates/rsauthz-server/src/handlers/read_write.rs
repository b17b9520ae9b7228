//! Raw tuple read and write for tooling.

use rsauthz_common::TupleKey;
use rsauthz_store::{
    OnDuplicate, OnMissing, PaginatedResult, PaginationOptions, TupleFilter, TupleStore,
    WriteRequest as StoreWriteRequest,
};
use tracing::{info, instrument};

use crate::auth::AuthInfo;
use crate::error::{AuthzError, AuthzResult};
use crate::server::AuthzServer;

#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    pub namespace: String,
    pub filter: TupleFilter,
    /// Zero means the configured page size.
    pub page_size: u32,
    pub continuation_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct WriteRequest {
    pub namespace: String,
    pub writes: Vec<TupleKey>,
    pub deletes: Vec<TupleKey>,
}

impl<S: TupleStore> AuthzServer<S> {
    #[instrument(skip(self, caller, request), fields(namespace = %request.namespace))]
    pub async fn read(
        &self,
        caller: &AuthInfo,
        request: &ReadRequest,
    ) -> AuthzResult<PaginatedResult<TupleKey>> {
        caller.authorize_namespace(&request.namespace)?;
        let info = self.cache.get_store_info(&request.namespace).await?;

        let page_size = if request.page_size == 0 {
            self.settings.read_page_size
        } else {
            request.page_size
        };
        let pagination =
            PaginationOptions::new(page_size).with_token(request.continuation_token.clone());
        Ok(self.store.read(&info.id, &request.filter, &pagination).await?)
    }

    /// Writes and deletes tuples as given. Duplicate writes and missing
    /// deletes are ignored.
    #[instrument(skip(self, caller, request), fields(
        namespace = %request.namespace,
        writes = request.writes.len(),
        deletes = request.deletes.len(),
    ))]
    pub async fn write(&self, caller: &AuthInfo, request: &WriteRequest) -> AuthzResult<()> {
        caller.authorize_write(&request.namespace, &self.write_permission)?;
        if request.writes.is_empty() && request.deletes.is_empty() {
            return Err(AuthzError::invalid("write request has no tuples"));
        }

        let info = self.cache.get_store_info(&request.namespace).await?;
        self.store
            .write(&StoreWriteRequest {
                store_id: info.id,
                model_id: info.model_id,
                writes: request.writes.clone(),
                deletes: request.deletes.clone(),
                on_duplicate: OnDuplicate::Ignore,
                on_missing: OnMissing::Ignore,
            })
            .await?;
        info!("wrote tuples");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use rsauthz_store::MemoryTupleStore;

    fn server() -> AuthzServer<MemoryTupleStore> {
        AuthzServer::new(MemoryTupleStore::new_shared(), &ServerConfig::default())
    }

    fn writer() -> AuthInfo {
        AuthInfo::new("org").with_permission("authz:write")
    }

    #[tokio::test]
    async fn test_write_then_read_back() {
        let server = server();
        let tuple = TupleKey::new("user:1", "get", "folder:a");
        server
            .write(
                &writer(),
                &WriteRequest {
                    namespace: "org".to_string(),
                    writes: vec![tuple.clone()],
                    deletes: Vec::new(),
                },
            )
            .await
            .unwrap();

        let page = server
            .read(
                &AuthInfo::new("org"),
                &ReadRequest {
                    namespace: "org".to_string(),
                    filter: TupleFilter::object("folder:a"),
                    ..ReadRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.items, vec![tuple]);
        assert!(page.continuation_token.is_none());
    }

    #[tokio::test]
    async fn test_read_paginates() {
        let server = server();
        let writes = (0..5)
            .map(|i| TupleKey::new(format!("user:{i}"), "get", "folder:a"))
            .collect();
        server
            .write(
                &writer(),
                &WriteRequest {
                    namespace: "org".to_string(),
                    writes,
                    deletes: Vec::new(),
                },
            )
            .await
            .unwrap();

        let mut request = ReadRequest {
            namespace: "org".to_string(),
            page_size: 2,
            ..ReadRequest::default()
        };
        let mut seen = 0;
        loop {
            let page = server.read(&AuthInfo::new("org"), &request).await.unwrap();
            seen += page.items.len();
            match page.continuation_token {
                Some(token) => request.continuation_token = Some(token),
                None => break,
            }
        }
        assert_eq!(seen, 5);
    }

    #[tokio::test]
    async fn test_write_requires_write_permission() {
        let server = server();
        let result = server
            .write(
                &AuthInfo::new("org"),
                &WriteRequest {
                    namespace: "org".to_string(),
                    writes: vec![TupleKey::new("user:1", "get", "folder:a")],
                    deletes: Vec::new(),
                },
            )
            .await;
        assert!(matches!(result, Err(AuthzError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn test_empty_write_is_invalid() {
        let result = server()
            .write(
                &writer(),
                &WriteRequest {
                    namespace: "org".to_string(),
                    ..WriteRequest::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AuthzError::InvalidArgument { .. })));
    }
}
