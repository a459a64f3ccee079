//! Shared type definitions for the ticket engine.
//!
//! Everything here is plain data: identifiers, the ticket entity and its
//! status machine, the service/counter reference types served by the
//! catalog and directory traits, and the result types the allocation
//! engine hands back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a service type (e.g. "Deposits", "Loans")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceId(pub i64);

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a staffed counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CounterId(pub i64);

impl fmt::Display for CounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable ticket code, e.g. `D-003`.
///
/// The prefix is the service tag; the numeric suffix is the ticket's
/// sequence number within the tag's calendar day, zero-padded to at
/// least three digits. Codes are globally unique and immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketCode(String);

impl TicketCode {
    pub fn new(code: impl Into<String>) -> Self {
        TicketCode(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TicketCode {
    fn from(code: &str) -> Self {
        TicketCode(code.to_string())
    }
}

/// Lifecycle state of a ticket.
///
/// Transitions only move forward: Waiting → Called → Served. Whether a
/// ticket may jump Waiting → Served directly is a configuration decision
/// (see `CompletionConfig`), not a property of the state machine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Waiting,
    Called,
    Served,
}

impl TicketStatus {
    /// Stable string form used by the durable store
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Waiting => "WAITING",
            TicketStatus::Called => "CALLED",
            TicketStatus::Served => "SERVED",
        }
    }

    /// Parse the durable store's string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WAITING" => Some(TicketStatus::Waiting),
            "CALLED" => Some(TicketStatus::Called),
            "SERVED" => Some(TicketStatus::Served),
            _ => None,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A service ticket as held by the durable store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub code: TicketCode,
    pub service_id: ServiceId,
    pub status: TicketStatus,
    /// Counter that called the ticket; set on dispatch, never cleared
    pub counter_id: Option<CounterId>,
    pub created_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
    pub served_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// A freshly issued ticket, waiting in its service queue
    pub fn waiting(code: TicketCode, service_id: ServiceId, created_at: DateTime<Utc>) -> Self {
        Ticket {
            code,
            service_id,
            status: TicketStatus::Waiting,
            counter_id: None,
            created_at,
            called_at: None,
            served_at: None,
        }
    }
}

/// A service type offered at the hall
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    /// Short uppercase code used as the ticket-code prefix; stable and unique
    pub tag: String,
    pub name: String,
    /// Average handling time in minutes, used for display estimates only
    pub avg_service_minutes: u32,
}

/// A staffed counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub id: CounterId,
    pub name: String,
    /// Inactive counters are never dispatched a ticket
    pub is_active: bool,
}

/// What the customer gets back from `enqueue`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueReceipt {
    pub code: TicketCode,
    /// 1-based position in the service's queue at issue time
    pub position_in_queue: usize,
    pub queue_length: usize,
}

/// What the counter gets back from a successful `dispatch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalledTicket {
    pub code: TicketCode,
    pub service_tag: String,
    pub called_at: DateTime<Utc>,
}

/// Per-service row of the queue status report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatusEntry {
    pub service_id: ServiceId,
    pub service_tag: String,
    pub service_name: String,
    pub queue_length: usize,
    /// `queue_length × avg_service_minutes`; a display estimate, not a promise
    pub estimated_wait_minutes: u64,
}

/// Aggregate engine statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub total_waiting: usize,
    pub services: usize,
    pub counters: usize,
    pub active_counters: usize,
}
