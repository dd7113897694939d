//! # cb-observability
//!
//! Structured logging setup for the crossbill crates.

pub mod logging;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
