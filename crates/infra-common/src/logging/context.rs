use std::collections::HashMap;
use std::fmt;
use tracing::Span;

/// Structured context attached to a group of related log events.
///
/// Components build one of these once (component name, optional operation,
/// extra key/value fields) and enter the resulting span around the work,
/// so every event inside carries the same identifying fields.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub component: String,
    pub operation: Option<String>,
    pub fields: HashMap<String, String>,
}

impl LogContext {
    /// Context for a component with no specific operation
    pub fn new(component: impl Into<String>) -> Self {
        LogContext {
            component: component.into(),
            operation: None,
            fields: HashMap::new(),
        }
    }

    /// Context for a component performing a named operation
    pub fn for_operation(component: impl Into<String>, operation: impl Into<String>) -> Self {
        LogContext {
            component: component.into(),
            operation: Some(operation.into()),
            fields: HashMap::new(),
        }
    }

    /// Attach an extra key/value field
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Create an INFO-level span carrying this context.
    ///
    /// Extra fields are rendered through the context's `Display` form since
    /// `tracing` spans need statically-known field names.
    pub fn span(&self) -> Span {
        match &self.operation {
            Some(op) => tracing::info_span!(
                "tellerq",
                component = %self.component,
                operation = %op,
                context = %self,
            ),
            None => tracing::info_span!(
                "tellerq",
                component = %self.component,
                context = %self,
            ),
        }
    }

    /// Run a closure inside this context's span
    pub fn scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let span = self.span();
        let _guard = span.enter();
        f()
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.component)?;
        if let Some(op) = &self.operation {
            write!(f, "[{}]", op)?;
        }
        for (key, value) in &self.fields {
            write!(f, "[{}={}]", key, value)?;
        }
        Ok(())
    }
}
