//! Tuple reconciler.
//!
//! Keeps the tuples of each namespace equal to the tuples implied by its
//! declarative objects (folders, roles, bindings, resource permissions and
//! users).
//!
//! # Flow
//!
//! ```text
//! ticker ──> enumerate namespaces ──> bounded queue ──> N workers
//!                                                          │
//!                           read current tuples <──────────┤
//!                  list + translate objects per kind <─────┤
//!                                        compute diff <────┤
//!                      write deletes, then adds, batched <─┘
//! ```
//!
//! Enumeration blocks when the queue is full. On cancellation the queue is
//! closed and the workers finish what is already queued before `run`
//! returns.

mod diff;
mod error;
mod source;
mod translators;


pub use diff::{compute_diff, ReconcileDiff};
pub use error::ReconcileError;
pub use source::{MemoryObjectSource, ObjectKind, ObjectPage, ObjectSource, SourceError};
pub use translators::{translate, TranslateError, FOLDER_PARENT_ANNOTATION};

use std::collections::BTreeSet;
use std::sync::Arc;

use rsauthz_common::TupleKey;
use rsauthz_store::{
    OnDuplicate, OnMissing, PaginationOptions, TupleFilter, TupleStore,
    WriteRequest as StoreWriteRequest,
};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::ReconcilerSettings;
use crate::store_cache::{StoreCache, StoreInfo};

/// Tuples applied to one namespace in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub added: usize,
    pub deleted: usize,
}

#[derive(Debug, Default)]
struct BatchOutcome {
    applied: usize,
    failed: usize,
    total: usize,
}

type NamespaceQueue = Arc<Mutex<mpsc::Receiver<String>>>;

pub struct Reconciler<S: TupleStore, O: ObjectSource> {
    store: Arc<S>,
    source: Arc<O>,
    cache: Arc<StoreCache<S>>,
    settings: ReconcilerSettings,
}

impl<S: TupleStore, O: ObjectSource> Reconciler<S, O> {
    pub fn new(
        store: Arc<S>,
        source: Arc<O>,
        cache: Arc<StoreCache<S>>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            store,
            source,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// Runs the reconcile loop until `cancel` fires, then drains the queue.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        if !self.settings.enabled {
            info!("reconciler disabled");
            return;
        }

        let (tx, rx) = mpsc::channel::<String>(self.settings.queue_size.max(1));
        let queue: NamespaceQueue = Arc::new(Mutex::new(rx));
        let workers: Vec<JoinHandle<()>> = (0..self.settings.workers.max(1))
            .map(|id| {
                let reconciler = Arc::clone(&self);
                let queue = Arc::clone(&queue);
                tokio::spawn(async move { reconciler.worker(id, queue).await })
            })
            .collect();

        let mut ticker = interval(self.settings.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = self.settings.interval().as_secs(),
            workers = workers.len(),
            queue_size = self.settings.queue_size,
            "reconciler started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("reconciler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if !self.enqueue_namespaces(&tx, &cancel).await {
                        info!("reconciler shutting down");
                        break;
                    }
                }
            }
        }

        // Closing the sender lets workers drain what is queued and exit.
        drop(tx);
        for worker in workers {
            if let Err(err) = worker.await {
                warn!(error = %err, "reconcile worker failed");
            }
        }
        info!("reconciler stopped");
    }

    /// Queues every namespace. Returns false once cancelled.
    async fn enqueue_namespaces(
        &self,
        tx: &mpsc::Sender<String>,
        cancel: &CancellationToken,
    ) -> bool {
        let namespaces = match self.namespaces().await {
            Ok(namespaces) => namespaces,
            Err(err) => {
                warn!(error = %err, "failed to enumerate namespaces");
                return true;
            }
        };
        debug!(count = namespaces.len(), "queueing namespaces");

        for namespace in namespaces {
            tokio::select! {
                _ = cancel.cancelled() => return false,
                sent = tx.send(namespace) => {
                    if sent.is_err() {
                        return false;
                    }
                }
            }
        }
        true
    }

    async fn worker(&self, id: usize, queue: NamespaceQueue) {
        debug!(worker = id, "reconcile worker started");
        loop {
            let next = queue.lock().await.recv().await;
            let Some(namespace) = next else {
                break;
            };
            match self.reconcile_namespace(&namespace).await {
                Ok(stats) => debug!(
                    worker = id,
                    %namespace,
                    added = stats.added,
                    deleted = stats.deleted,
                    "namespace reconciled"
                ),
                Err(err) => warn!(worker = id, %namespace, error = %err, "reconcile failed"),
            }
        }
        debug!(worker = id, "reconcile worker stopped");
    }

    /// Namespaces with a store or with declarative objects, sorted.
    pub async fn namespaces(&self) -> Result<Vec<String>, ReconcileError> {
        let mut namespaces = BTreeSet::new();
        let mut pagination = PaginationOptions::new(self.settings.read_page_size);
        loop {
            let page = self.store.list_stores(&pagination).await?;
            namespaces.extend(page.items.into_iter().map(|store| store.name));
            match page.continuation_token {
                Some(token) => pagination = pagination.with_token(Some(token)),
                None => break,
            }
        }
        namespaces.extend(
            self.source
                .namespaces()
                .await
                .map_err(ReconcileError::Enumerate)?,
        );
        Ok(namespaces.into_iter().collect())
    }

    /// Reconciles every namespace once, in order.
    pub async fn reconcile_once(
        &self,
    ) -> Result<Vec<(String, Result<ReconcileStats, ReconcileError>)>, ReconcileError> {
        let namespaces = self.namespaces().await?;
        let mut results = Vec::with_capacity(namespaces.len());
        for namespace in namespaces {
            let result = self.reconcile_namespace(&namespace).await;
            results.push((namespace, result));
        }
        Ok(results)
    }

    /// Brings one namespace in line with its declarative objects.
    ///
    /// A kind that fails to list or translate is reported, its tuples are
    /// left out of the expected set, and nothing is deleted in this pass.
    /// A failed write batch does not stop the remaining batches.
    #[instrument(skip(self))]
    pub async fn reconcile_namespace(
        &self,
        namespace: &str,
    ) -> Result<ReconcileStats, ReconcileError> {
        let info = self.cache.get_store_info(namespace).await?;
        let current = self.current_tuples(&info).await?;

        let mut errors = Vec::new();
        let mut expected = Vec::new();
        for kind in ObjectKind::ALL {
            match self.expected_tuples(namespace, kind).await {
                Ok(tuples) => expected.extend(tuples),
                Err(err) => {
                    warn!(%kind, error = %err, "skipping kind for this pass");
                    errors.push(err);
                }
            }
        }

        let mut diff = compute_diff(expected, current);
        if !errors.is_empty() && !diff.to_delete.is_empty() {
            warn!(
                skipped = diff.to_delete.len(),
                "holding back deletes after a failed kind"
            );
            diff.to_delete.clear();
        }

        let mut stats = ReconcileStats::default();
        if diff.is_empty() {
            debug!("namespace in sync");
        } else {
            let deleted = self.write_batches(&info, diff.to_delete, true).await;
            let added = self.write_batches(&info, diff.to_add, false).await;
            stats.deleted = deleted.applied;
            stats.added = added.applied;

            let failed = deleted.failed + added.failed;
            if failed > 0 {
                errors.push(ReconcileError::BatchesFailed {
                    failed,
                    total: deleted.total + added.total,
                });
            }
            info!(added = stats.added, deleted = stats.deleted, failed, "applied diff");
        }

        match ReconcileError::collect(errors) {
            Some(err) => Err(err),
            None => Ok(stats),
        }
    }

    async fn current_tuples(&self, info: &StoreInfo) -> Result<Vec<TupleKey>, ReconcileError> {
        let filter = TupleFilter::default();
        let mut pagination = PaginationOptions::new(self.settings.read_page_size);
        let mut tuples = Vec::new();
        loop {
            let page = self.store.read(&info.id, &filter, &pagination).await?;
            tuples.extend(page.items);
            match page.continuation_token {
                Some(token) => pagination = pagination.with_token(Some(token)),
                None => return Ok(tuples),
            }
        }
    }

    /// Lists all objects of `kind`, translating page by page.
    async fn expected_tuples(
        &self,
        namespace: &str,
        kind: ObjectKind,
    ) -> Result<Vec<TupleKey>, ReconcileError> {
        let mut tuples = Vec::new();
        let mut token = None;
        loop {
            let page = self
                .source
                .list(namespace, kind, self.settings.list_page_size, token)
                .await
                .map_err(|err| ReconcileError::Source {
                    kind,
                    message: err.to_string(),
                })?;
            for object in &page.items {
                let translated =
                    translate(kind, object).map_err(|err| ReconcileError::Translate {
                        kind,
                        name: err.name,
                        message: err.message,
                    })?;
                tuples.extend(translated);
            }
            match page.continue_token {
                Some(next) => token = Some(next),
                None => return Ok(tuples),
            }
        }
    }

    async fn write_batches(
        &self,
        info: &StoreInfo,
        tuples: Vec<TupleKey>,
        delete: bool,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for chunk in tuples.chunks(self.settings.write_batch_size.max(1)) {
            outcome.total += 1;
            let (writes, deletes) = if delete {
                (Vec::new(), chunk.iter().map(TupleKey::without_condition).collect())
            } else {
                (chunk.to_vec(), Vec::new())
            };
            let request = StoreWriteRequest {
                store_id: info.id.clone(),
                model_id: info.model_id.clone(),
                writes,
                deletes,
                on_duplicate: OnDuplicate::Ignore,
                on_missing: OnMissing::Ignore,
            };
            match self.store.write(&request).await {
                Ok(()) => outcome.applied += chunk.len(),
                Err(err) => {
                    outcome.failed += 1;
                    warn!(
                        batch = outcome.total,
                        size = chunk.len(),
                        delete,
                        error = %err,
                        "write batch failed"
                    );
                }
            }
        }
        outcome
    }
}
