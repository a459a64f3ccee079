//! Generic infrastructure error type.

use thiserror::Error;

/// Errors raised by infrastructure components.
///
/// Domain crates define their own richer enums; this type covers the
/// plumbing layers (logging setup, configuration parsing) and acts as the
/// carrier for [`ErrorExt`](crate::errors::ErrorExt) context chains.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Shorthand for a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Shorthand for an internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
