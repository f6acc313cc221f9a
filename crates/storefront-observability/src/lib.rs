//! Observability infrastructure for the storefront.
//!
//! This crate provides:
//! - `init_logging` - Installs the global `tracing` subscriber (JSON or human output)
//! - `LoggingConfig` / `LogLevel` / `LogFormat` - Logging configuration
//! - `AlertRecorder` - Captures support alerts emitted on [`ALERT_TARGET`]

mod alert;
mod logging;

pub use alert::*;
pub use logging::*;
