//! Infrastructure error types and context helpers.

pub mod context;
pub mod types;

pub use context::{ErrorContext, ErrorExt};
pub use types::{Error, Result};
