use crate::errors::types::Error;
use std::fmt;

/// Where an error happened: the component and the operation in flight.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub component: String,
    pub operation: String,
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new(component: impl Into<String>, operation: impl Into<String>) -> Self {
        ErrorContext {
            component: component.into(),
            operation: operation.into(),
            details: None,
        }
    }

    pub fn detail(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.component, self.operation)?;
        if let Some(details) = &self.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

/// Attach location context to infrastructure errors as they bubble up.
///
/// The context is folded into the error message rather than kept as a
/// separate chain; these errors terminate in log output, not in callers
/// that need to pick them apart.
pub trait ErrorExt<T> {
    /// Wrap the error of a `Result` with component/operation context.
    fn err_ctx(self, component: &str, operation: &str) -> Result<T, Error>;

    /// Wrap with a full [`ErrorContext`], details included.
    fn err_with(self, ctx: ErrorContext) -> Result<T, Error>;
}

impl<T> ErrorExt<T> for Result<T, Error> {
    fn err_ctx(self, component: &str, operation: &str) -> Result<T, Error> {
        self.err_with(ErrorContext::new(component, operation))
    }

    fn err_with(self, ctx: ErrorContext) -> Result<T, Error> {
        self.map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("[{}] {}", ctx, msg)),
            Error::Io(msg) => Error::Io(format!("[{}] {}", ctx, msg)),
            Error::Internal(msg) => Error::Internal(format!("[{}] {}", ctx, msg)),
            Error::Custom(msg) => Error::Custom(format!("[{}] {}", ctx, msg)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_folded_into_message() {
        let res: Result<(), Error> = Err(Error::internal("subscriber already set"));
        let err = res.err_ctx("logging", "setup").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("logging/setup"));
        assert!(msg.contains("subscriber already set"));
    }

    #[test]
    fn variant_is_preserved() {
        let res: Result<(), Error> = Err(Error::config("bad level"));
        let err = res.err_ctx("logging", "parse").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn details_are_rendered() {
        let ctx = ErrorContext::new("engine", "dispatch").detail("counter 3");
        assert_eq!(ctx.to_string(), "engine/dispatch: counter 3");
    }
}
