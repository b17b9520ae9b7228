//! ListObjects with an optional streaming backend.
//!
//! Callers always get the full object list. When streaming is enabled the
//! store's object stream is forwarded through a bounded channel by a
//! separate task and accumulated here until the stream ends.

use std::sync::Arc;

use futures::StreamExt;
use rsauthz_store::{ListObjectsRequest, StoreError, TupleStore};
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::EngineSettings;
use crate::error::AuthzResult;

pub struct ObjectLister<S: TupleStore> {
    store: Arc<S>,
    streamed: bool,
    buffer: usize,
}

impl<S: TupleStore> ObjectLister<S> {
    pub fn new(store: Arc<S>, settings: &EngineSettings) -> Self {
        Self {
            store,
            streamed: settings.use_streamed_list_objects,
            buffer: settings.list_stream_buffer.max(1),
        }
    }

    pub async fn list_objects(&self, request: &ListObjectsRequest) -> AuthzResult<Vec<String>> {
        if !self.streamed {
            return Ok(self.store.list_objects(request).await?);
        }

        let mut stream = self.store.streamed_list_objects(request).await?;
        let (tx, mut rx) = mpsc::channel(self.buffer);
        let forward = tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                if tx.send(item).await.is_err() {
                    // Receiver gave up.
                    break;
                }
            }
        });

        let mut objects = Vec::new();
        while let Some(item) = rx.recv().await {
            match item {
                Ok(object) => objects.push(object),
                Err(e) => {
                    forward.abort();
                    return Err(e.into());
                }
            }
        }

        forward.await.map_err(|e| StoreError::InternalError {
            message: format!("list objects stream task failed: {e}"),
        })?;
        debug!(count = objects.len(), "collected streamed objects");
        Ok(objects)
    }
}
