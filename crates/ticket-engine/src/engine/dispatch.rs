//! Next-ticket selection: the counter-facing half of the engine.

use crate::engine::AllocationEngine;
use crate::error::{Result, TicketEngineError};
use crate::store::TicketUpdate;
use crate::types::{CalledTicket, CounterId, Service};
use chrono::Utc;
use tracing::{debug, info};

impl AllocationEngine {
    /// Pull the next ticket for a counter.
    ///
    /// Candidate services are the counter's supported services with a
    /// non-empty cached queue; the winner is the one with the longest
    /// line, ties going to the faster service (smallest average handling
    /// time), then to the lexicographically smallest tag so the choice
    /// is deterministic for a given snapshot. A greedy load-leveling
    /// heuristic, not an optimal schedule.
    ///
    /// `Ok(None)` means nobody is waiting — an expected outcome, not an
    /// error. If another dispatch drains the selected queue between the
    /// length snapshot and the pop, selection re-runs over the remaining
    /// candidates instead of failing.
    pub async fn dispatch(&self, counter_id: CounterId) -> Result<Option<CalledTicket>> {
        let counter = self.resolve_counter(counter_id).await?;
        if !counter.is_active {
            return Err(TicketEngineError::CounterInactive(counter_id));
        }

        let services = self.supported_services(counter_id).await?;
        if services.is_empty() {
            return Err(TicketEngineError::CounterHasNoServices(counter_id));
        }

        if self.config().dispatch.exclusive_called {
            if let Some(held) = self.store().called_ticket_for_counter(counter_id).await? {
                debug!(
                    "Counter {} still holds called ticket {}",
                    counter_id, held.code
                );
                return Err(TicketEngineError::CounterBusy(counter_id));
            }
        }

        // Snapshot the queue pressure across the counter's services
        let mut candidates: Vec<(Service, usize)> = Vec::with_capacity(services.len());
        for service in services {
            let len = self.queues.len(service.id).await?;
            if len > 0 {
                candidates.push((service, len));
            }
        }

        loop {
            let Some(best) = pick_candidate(&candidates) else {
                debug!("No waiting tickets for counter {}", counter_id);
                return Ok(None);
            };
            let (service, _) = candidates.swap_remove(best);

            let queue = self.queues.hydrated(service.id).await?;
            let mut line = queue.lock().await;
            let Some(code) = line.pop_front() else {
                // Raced with another dispatch; try the remaining services
                debug!("Queue for service '{}' drained mid-dispatch", service.tag);
                continue;
            };

            let called_at = Utc::now();
            match self
                .store()
                .update_ticket(&code, TicketUpdate::called(counter_id, called_at))
                .await
            {
                Ok(()) => {
                    drop(line);
                    info!(
                        "Dispatched ticket {} to counter {} ({})",
                        code, counter_id, counter.name
                    );
                    return Ok(Some(CalledTicket {
                        code,
                        service_tag: service.tag,
                        called_at,
                    }));
                }
                Err(e) => {
                    // Durable update failed: the ticket is still WAITING,
                    // so it goes back to the head of the line
                    line.push_front(code);
                    return Err(e);
                }
            }
        }
    }
}

/// Index of the best candidate: longest queue, ties to the smallest
/// average service time, then the smallest tag.
fn pick_candidate(candidates: &[(Service, usize)]) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }
    let mut best = 0;
    for idx in 1..candidates.len() {
        let (service, len) = &candidates[idx];
        let (best_service, best_len) = &candidates[best];
        let ordering = len
            .cmp(best_len)
            .then_with(|| best_service.avg_service_minutes.cmp(&service.avg_service_minutes))
            .then_with(|| best_service.tag.cmp(&service.tag));
        if ordering == std::cmp::Ordering::Greater {
            best = idx;
        }
    }
    Some(best)
}
