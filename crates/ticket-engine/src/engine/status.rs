//! Ticket completion and queue status reporting.

use crate::engine::AllocationEngine;
use crate::error::{Result, TicketEngineError};
use crate::store::TicketUpdate;
use crate::types::{QueueStatusEntry, TicketCode, TicketStatus};
use chrono::Utc;
use tracing::info;

impl AllocationEngine {
    /// Mark a ticket as served.
    ///
    /// Called → Served always succeeds; serving an already-SERVED ticket
    /// is a conflict. Waiting → Served (the counter never called the
    /// ticket) is governed by `completion.allow_direct_serve`: when
    /// permitted, the code is also pulled out of the cached waiting line
    /// so the queue index keeps mirroring the store.
    pub async fn complete_ticket(&self, code: &TicketCode) -> Result<()> {
        let ticket = self
            .store()
            .find_by_code(code)
            .await?
            .ok_or_else(|| TicketEngineError::TicketNotFound(code.clone()))?;

        match ticket.status {
            TicketStatus::Served => Err(TicketEngineError::AlreadyServed(code.clone())),
            TicketStatus::Called => {
                self.store()
                    .update_ticket(code, TicketUpdate::served(Utc::now()))
                    .await?;
                info!("Ticket {} served", code);
                Ok(())
            }
            TicketStatus::Waiting => {
                if !self.config().completion.allow_direct_serve {
                    return Err(TicketEngineError::InvalidTransition {
                        code: code.clone(),
                        from: TicketStatus::Waiting,
                        to: TicketStatus::Served,
                    });
                }
                self.serve_waiting_ticket(&ticket, code).await
            }
        }
    }

    /// Direct Waiting → Served: evict from the cached line (if that
    /// service was ever hydrated) and persist, under the queue lock so a
    /// concurrent dispatch cannot call a ticket that is being served.
    async fn serve_waiting_ticket(
        &self,
        ticket: &crate::types::Ticket,
        code: &TicketCode,
    ) -> Result<()> {
        let update = TicketUpdate::served(Utc::now());

        if let Some(queue) = self.queues.cached(ticket.service_id) {
            let mut line = queue.lock().await;
            let removed_at = if line.is_hydrated() {
                line.remove(code)
            } else {
                None
            };
            match self.store().update_ticket(code, update).await {
                Ok(()) => {
                    info!("Ticket {} served directly from the waiting line", code);
                    Ok(())
                }
                Err(e) => {
                    // Store still says WAITING; restore the cached position
                    if let Some(position) = removed_at {
                        line.insert(position, code.clone());
                    }
                    Err(e)
                }
            }
        } else {
            // Service never hydrated: nothing cached to fix up
            self.store().update_ticket(code, update).await?;
            info!("Ticket {} served directly from the waiting line", code);
            Ok(())
        }
    }

    /// Current queue length for every known service, tag-ordered.
    ///
    /// Read-only apart from lazily hydrating untouched services. The
    /// wait estimate is the queue length times the service's average
    /// handling minutes — display material, nothing schedules on it.
    pub async fn queue_status(&self) -> Result<Vec<QueueStatusEntry>> {
        let services = self.list_services().await?;
        let mut entries = Vec::with_capacity(services.len());

        for service in services {
            let queue_length = self.queues.len(service.id).await?;
            entries.push(QueueStatusEntry {
                service_id: service.id,
                service_tag: service.tag,
                service_name: service.name,
                queue_length,
                estimated_wait_minutes: queue_length as u64 * service.avg_service_minutes as u64,
            });
        }

        Ok(entries)
    }
}
