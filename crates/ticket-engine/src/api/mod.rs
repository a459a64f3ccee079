//! Role-scoped API facades over the allocation engine.
//!
//! Request handlers get one of these instead of the whole engine, so a
//! kiosk endpoint cannot dispatch tickets and a counter terminal cannot
//! issue them. Each facade is a cheap clone holding an `Arc` to the one
//! engine instance.

use crate::engine::AllocationEngine;
use crate::error::Result;
use crate::types::{
    CalledTicket, Counter, CounterId, EngineStats, EnqueueReceipt, QueueStatusEntry, ServiceId,
    TicketCode,
};
use std::sync::Arc;

/// Customer-facing operations: take a ticket, watch the board
#[derive(Clone)]
pub struct KioskApi {
    engine: Arc<AllocationEngine>,
}

impl KioskApi {
    pub fn new(engine: Arc<AllocationEngine>) -> Self {
        KioskApi { engine }
    }

    /// Issue a ticket for a service
    pub async fn take_ticket(&self, service: ServiceId) -> Result<EnqueueReceipt> {
        self.engine.enqueue(service).await
    }

    /// Queue lengths and wait estimates for the display board
    pub async fn queue_status(&self) -> Result<Vec<QueueStatusEntry>> {
        self.engine.queue_status().await
    }
}

/// Counter-facing operations: call the next customer, finish a ticket
#[derive(Clone)]
pub struct ClerkApi {
    engine: Arc<AllocationEngine>,
}

impl ClerkApi {
    pub fn new(engine: Arc<AllocationEngine>) -> Self {
        ClerkApi { engine }
    }

    /// Pull the next ticket for this counter; `None` when nobody waits
    pub async fn next_ticket(&self, counter: CounterId) -> Result<Option<CalledTicket>> {
        self.engine.dispatch(counter).await
    }

    /// Mark a ticket as served
    pub async fn complete_ticket(&self, code: &TicketCode) -> Result<()> {
        self.engine.complete_ticket(code).await
    }
}

/// Monitoring operations for supervisors and dashboards
#[derive(Clone)]
pub struct SupervisorApi {
    engine: Arc<AllocationEngine>,
}

impl SupervisorApi {
    pub fn new(engine: Arc<AllocationEngine>) -> Self {
        SupervisorApi { engine }
    }

    pub async fn queue_status(&self) -> Result<Vec<QueueStatusEntry>> {
        self.engine.queue_status().await
    }

    pub async fn stats(&self) -> Result<EngineStats> {
        self.engine.stats().await
    }

    pub async fn list_counters(&self) -> Result<Vec<Counter>> {
        self.engine.list_counters().await
    }
}
