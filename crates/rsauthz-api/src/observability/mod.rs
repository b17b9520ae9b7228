//! Observability setup for the rsauthz binary.

mod logging;

pub use logging::{init_logging, LoggingConfig};
