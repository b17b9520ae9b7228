//! rsauthz-store: Tuple store abstraction
//!
//! This crate provides the relationship-tuple engine consumed by the
//! authorization server:
//! - TupleStore trait for store, model and tuple operations
//! - In-memory implementation that evaluates the authorization model
//! - CEL evaluation of tuple conditions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rsauthz-store                  │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - TupleStore trait definition  │
//! │  memory.rs   - In-memory implementation     │
//! │  resolver.rs - Userset rewrite evaluation   │
//! │  cel.rs      - Condition evaluation         │
//! └─────────────────────────────────────────────┘
//! ```

pub mod cel;
pub mod error;
pub mod memory;
mod resolver;
pub mod traits;

// Re-export commonly used types
pub use error::{StoreError, StoreResult};
pub use memory::MemoryTupleStore;
pub use traits::{
    CheckRequest, ListObjectsRequest, OnDuplicate, OnMissing, PaginatedResult, PaginationOptions,
    Store, StoredAuthorizationModel, TupleFilter, TupleStore, WriteRequest,
};
