//! rsauthz-server: authorization decisions and tuple reconciliation
//!
//! This crate contains the decision layer including:
//! - Check, BatchCheck, List and Capabilities over the tuple store
//! - Mutate for translating platform operations into tuple writes
//! - Read/Write passthrough and the authorization context
//! - The namespace store/model cache
//! - The reconciler keeping tuples in line with declarative objects
//! - Configuration management
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 rsauthz-server                  │
//! ├─────────────────────────────────────────────────┤
//! │  config.rs       - Configuration management     │
//! │  auth.rs         - Caller authorization         │
//! │  store_cache.rs  - Namespace -> store/model     │
//! │  list_objects.rs - Plain or streamed listing    │
//! │  handlers/       - Request handlers             │
//! │    check.rs        - Single check               │
//! │    batch/          - Batch checks with memo     │
//! │    list.rs         - Folder/item listing        │
//! │    capabilities.rs - Allowed verbs              │
//! │    mutate/         - Operation translation      │
//! │    read_write.rs   - Tuple passthrough          │
//! │    context.rs      - Contextual tuples          │
//! │  reconciler/     - Declarative object sync      │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod list_objects;
pub mod reconciler;
pub mod server;
pub mod store_cache;

// Re-exports for convenience
pub use auth::{AuthInfo, ANY_NAMESPACE};
pub use config::{ConfigLoadError, ServerConfig};
pub use error::{AuthzError, AuthzResult};
pub use reconciler::{
    MemoryObjectSource, ObjectKind, ObjectSource, ReconcileError, ReconcileStats, Reconciler,
};
pub use server::AuthzServer;
pub use store_cache::{StoreCache, StoreInfo};
