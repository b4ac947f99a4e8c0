//! Logging bootstrap for keel services.
//!
//! Builds a `tracing` subscriber from a small, file-friendly
//! configuration: level, plain or JSON formatting, stdout or file
//! output. A `RUST_LOG` environment variable overrides the configured
//! level with full per-target directives.

pub mod logging;

pub use logging::{init, LogConfig, LogFormat, LogOutput};
