//! rsauthz-common: Tuple and resource model
//!
//! This crate contains the pure building blocks shared by every other crate:
//! - Identifier codec for `type:id[#relation]` strings
//! - Tuple keys, conditions and the tuple constructors used for grants
//! - Verb to relation translation and the per-type relation vocabularies
//! - Resource descriptions for check and list requests
//! - RBAC action to tuple translation tables
//! - The authorization model types and the built-in model
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rsauthz-common                 │
//! ├─────────────────────────────────────────────┤
//! │  ident.rs       - Identifier codec          │
//! │  tuple.rs       - Tuple keys & conditions   │
//! │  relations.rs   - Verbs & relation sets     │
//! │  resource.rs    - ResourceInfo              │
//! │  translation.rs - RBAC action tables        │
//! │  model.rs       - Authorization model types │
//! │  schema.rs      - Built-in model            │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod ident;
pub mod model;
pub mod relations;
pub mod resource;
pub mod schema;
pub mod translation;
pub mod tuple;

#[cfg(test)]
mod ident_proptest;

// Re-export commonly used types at the crate root
pub use error::{CommonError, CommonResult};
pub use ident::Ident;
pub use resource::ResourceInfo;
pub use tuple::{Condition, TupleIdentity, TupleKey};
