//! Error types for ticket engine operations

use crate::types::{CounterId, ServiceId, TicketCode, TicketStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TicketEngineError {
    // Not-found conditions
    #[error("Service {0} not found")]
    ServiceNotFound(ServiceId),

    #[error("Counter {0} not found")]
    CounterNotFound(CounterId),

    #[error("Ticket {0} not found")]
    TicketNotFound(TicketCode),

    // Precondition failures on dispatch
    #[error("Counter {0} is inactive")]
    CounterInactive(CounterId),

    #[error("Counter {0} has no supported services")]
    CounterHasNoServices(CounterId),

    // Conflicts
    #[error("Ticket code {0} already exists")]
    DuplicateCode(TicketCode),

    #[error("Ticket {0} has already been served")]
    AlreadyServed(TicketCode),

    #[error("Ticket {code}: transition {from} -> {to} is not allowed")]
    InvalidTransition {
        code: TicketCode,
        from: TicketStatus,
        to: TicketStatus,
    },

    #[error("Counter {0} already has a called ticket")]
    CounterBusy(CounterId),

    // Infrastructure
    #[error("Ticket store failure during {operation}: {message}")]
    Database { operation: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TicketEngineError {
    /// Wrap a store failure with the operation that was in flight,
    /// so logs can say what the engine was doing when the store broke.
    pub fn database(operation: &str, err: impl std::fmt::Display) -> Self {
        TicketEngineError::Database {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    /// True for the conflict family (duplicate code, already served,
    /// invalid transition, busy counter) that callers may retry or
    /// report as a business-state clash.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            TicketEngineError::DuplicateCode(_)
                | TicketEngineError::AlreadyServed(_)
                | TicketEngineError::InvalidTransition { .. }
                | TicketEngineError::CounterBusy(_)
        )
    }

    /// True for the not-found family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TicketEngineError::ServiceNotFound(_)
                | TicketEngineError::CounterNotFound(_)
                | TicketEngineError::TicketNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TicketEngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_families_are_distinguishable() {
        assert!(TicketEngineError::ServiceNotFound(ServiceId(9999)).is_not_found());
        assert!(TicketEngineError::AlreadyServed(TicketCode::from("D-001")).is_conflict());
        assert!(!TicketEngineError::database("enqueue", "disk full").is_conflict());
        assert!(!TicketEngineError::database("enqueue", "disk full").is_not_found());
    }

    #[test]
    fn database_error_names_the_operation() {
        let err = TicketEngineError::database("hydrate queue", "connection reset");
        let msg = err.to_string();
        assert!(msg.contains("hydrate queue"));
        assert!(msg.contains("connection reset"));
    }
}
