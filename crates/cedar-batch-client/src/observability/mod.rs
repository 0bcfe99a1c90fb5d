//! Observability infrastructure for the batch client.
//!
//! The pipeline emits `tracing` events and spans; this module installs the
//! subscriber that renders them.

mod logging;

pub use logging::{create_json_layer, init_logging, LoggingConfig};
