//! Batch permission check.
//!
//! Every item runs the single-check decision chain against one resolved
//! store. Two optimizations apply within a batch:
//!
//! 1. **Shared store resolution**: the namespace store is resolved once.
//! 2. **Group-resource memo**: the group-resource shortcut is checked once
//!    per distinct `(group/resource[/subresource], relation)` pair.
//!
//! A store error on any item fails the whole batch. An empty batch is
//! answered with no results and `all_allowed == false`.

mod handler;
mod types;

pub use types::{BatchCheckItem, BatchCheckRequest, BatchCheckResponse};

#[cfg(test)]
mod tests;
