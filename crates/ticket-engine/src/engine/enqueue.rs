//! Ticket issue: the customer-facing half of the engine.

use crate::engine::AllocationEngine;
use crate::error::Result;
use crate::types::{EnqueueReceipt, ServiceId, Ticket};
use chrono::Utc;
use tracing::info;

impl AllocationEngine {
    /// Issue a new ticket for a service.
    ///
    /// Atomic from the caller's perspective: the ticket is either
    /// persisted *and* appended to the in-memory queue, or neither. The
    /// tag lock is held from the daily count through the insert so
    /// concurrent requests cannot observe the same count, and the
    /// service's queue lock is held across persist + append so dispatch
    /// never sees a half-applied enqueue.
    ///
    /// Failure modes: unknown service → not-found; store write failure →
    /// infrastructure error with no in-memory change; code collision
    /// (only reachable if an external writer shares the store) →
    /// duplicate-code conflict, safe to retry.
    pub async fn enqueue(&self, service_id: ServiceId) -> Result<EnqueueReceipt> {
        let service = self.resolve_service(service_id).await?;
        let queue = self.queues.hydrated(service.id).await?;

        let _tag_guard = self.code_gen.lock_tag(&service.tag).await;
        let code = self.code_gen.next_code(&service.tag).await?;
        let ticket = Ticket::waiting(code.clone(), service.id, Utc::now());

        let mut line = queue.lock().await;
        self.store().create_ticket(&ticket).await?;
        line.push_back(code.clone());
        let queue_length = line.len();
        drop(line);

        info!(
            "Issued ticket {} for service '{}' (position {})",
            code, service.tag, queue_length
        );

        Ok(EnqueueReceipt {
            code,
            position_in_queue: queue_length,
            queue_length,
        })
    }
}
