//! # Infra-Common
//!
//! Shared infrastructure components for the tellerq stack.
//!
//! This crate provides the pieces every tellerq binary and service crate
//! needs but none of them owns:
//! - Logging setup built on `tracing` / `tracing-subscriber`
//! - Error context helpers for attaching component/operation information
//!
//! Domain crates define their own error enums; the helpers here are for
//! infrastructure-level plumbing and for binaries that want a quick,
//! consistent logging bootstrap.

pub mod errors;
pub mod logging;

pub use errors::{Error, ErrorContext, ErrorExt, Result};
pub use logging::{setup_logging, LogContext, LoggingConfig};
