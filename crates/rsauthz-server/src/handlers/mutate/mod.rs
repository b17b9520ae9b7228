//! Mutate: translating domain operations into tuple writes.
//!
//! Processing of one request:
//!
//! 1. **Authorize**: the caller needs the write permission up front.
//! 2. **Validate and translate**: every operation becomes writes and
//!    deletes before anything is written. Folder uids with `#` or `:` are
//!    rejected.
//! 3. **Group**: tuples are collected per [`OperationGroup`], keeping the
//!    request order inside a group.
//! 4. **Deduplicate**: a write and a delete of the same tuple keep the
//!    write.
//! 5. **Commit**: one store write per group, folders first and roles last.

mod dedup;
mod handler;
mod types;

pub use types::{
    MutateOperation, MutateRequest, OperationGroup, Permission, PermissionResource,
    RolePermission, RoleSubject,
};
