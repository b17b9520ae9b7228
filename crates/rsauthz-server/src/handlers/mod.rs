//! Request handlers.
//!
//! Each module adds its operations to [`crate::AuthzServer`]. All of them
//! authenticate the caller against the requested namespace first.

pub mod batch;
pub mod capabilities;
pub mod check;
pub mod context;
pub mod list;
pub mod mutate;
pub mod read_write;
