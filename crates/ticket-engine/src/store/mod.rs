//! Durable-store seams consumed by the allocation engine.
//!
//! The engine never talks to a database directly; it goes through three
//! narrow traits so deployments can swap the backing store and tests can
//! inject in-memory or failing implementations:
//!
//! - [`TicketStore`] — the durable ticket rows
//! - [`ServiceCatalog`] — service lookup and listing
//! - [`CounterDirectory`] — counter lookup and capability sets
//!
//! [`SqliteStore`] implements all three over a pooled SQLite database and
//! is the production backing; [`MemoryStore`] is the lightweight pure
//! in-memory equivalent used by unit tests and examples.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::{Counter, CounterId, Service, ServiceId, Ticket, TicketCode, TicketStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Field updates applied to a ticket row by code.
///
/// Only `Some` fields are written; the store must report not-found when
/// the code does not match any row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketUpdate {
    pub status: Option<TicketStatus>,
    pub counter_id: Option<CounterId>,
    pub called_at: Option<DateTime<Utc>>,
    pub served_at: Option<DateTime<Utc>>,
}

impl TicketUpdate {
    /// The CALLED transition: status, owning counter, call timestamp
    pub fn called(counter_id: CounterId, called_at: DateTime<Utc>) -> Self {
        TicketUpdate {
            status: Some(TicketStatus::Called),
            counter_id: Some(counter_id),
            called_at: Some(called_at),
            ..Default::default()
        }
    }

    /// The SERVED transition: status and serve timestamp
    pub fn served(served_at: DateTime<Utc>) -> Self {
        TicketUpdate {
            status: Some(TicketStatus::Served),
            served_at: Some(served_at),
            ..Default::default()
        }
    }
}

/// Durable ticket persistence.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Persist a new ticket row. Fails with `DuplicateCode` if the code
    /// already exists; this is the engine's last-resort collision check.
    async fn create_ticket(&self, ticket: &Ticket) -> Result<()>;

    /// Look up a ticket by its code
    async fn find_by_code(&self, code: &TicketCode) -> Result<Option<Ticket>>;

    /// All WAITING tickets for a service, ordered by `created_at`
    /// ascending (ties by code). This is the queue-index hydration query.
    async fn waiting_for_service(&self, service: ServiceId) -> Result<Vec<Ticket>>;

    /// Number of tickets created in `[from, to)` whose service carries
    /// the given tag. Drives daily sequence numbering.
    async fn count_created_between(
        &self,
        tag: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64>;

    /// Apply a partial update to the ticket with this code.
    /// Fails with `TicketNotFound` when no row matches.
    async fn update_ticket(&self, code: &TicketCode, update: TicketUpdate) -> Result<()>;

    /// The CALLED ticket currently held by a counter, if any.
    /// Used by the exclusive-called dispatch policy and monitoring.
    async fn called_ticket_for_counter(&self, counter: CounterId) -> Result<Option<Ticket>>;
}

/// Service catalog lookups.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    async fn find_service(&self, id: ServiceId) -> Result<Option<Service>>;

    /// All services, ordered by tag ascending
    async fn list_services(&self) -> Result<Vec<Service>>;
}

/// Counter directory and capability map.
#[async_trait]
pub trait CounterDirectory: Send + Sync {
    async fn find_counter(&self, id: CounterId) -> Result<Option<Counter>>;

    /// Services this counter can serve, ordered by tag ascending.
    /// Empty for unknown counters as well as for counters with no
    /// assignments; existence is checked via `find_counter`.
    async fn supported_services(&self, id: CounterId) -> Result<Vec<Service>>;

    /// All counters, ordered by id
    async fn list_counters(&self) -> Result<Vec<Counter>>;
}
