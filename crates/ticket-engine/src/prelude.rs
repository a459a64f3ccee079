//! Convenient re-exports for the common case.
//!
//! ```rust
//! use tellerq_ticket_engine::prelude::*;
//! ```

pub use crate::api::{ClerkApi, KioskApi, SupervisorApi};
pub use crate::config::{
    CodeConfig, CompletionConfig, DatabaseConfig, DispatchConfig, EngineConfig, GeneralConfig,
    MonitorConfig,
};
pub use crate::engine::AllocationEngine;
pub use crate::error::{Result, TicketEngineError};
pub use crate::queue::QueueIndex;
pub use crate::server::{TicketHallServer, TicketHallServerBuilder};
pub use crate::store::{
    CounterDirectory, MemoryStore, ServiceCatalog, SqliteStore, TicketStore, TicketUpdate,
};
pub use crate::types::{
    CalledTicket, Counter, CounterId, EngineStats, EnqueueReceipt, QueueStatusEntry, Service,
    ServiceId, Ticket, TicketCode, TicketStatus,
};
