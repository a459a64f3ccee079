//! In-memory store.
//!
//! A synchronous map-backed implementation of the store seams, useful
//! for unit tests, doc examples, and throwaway demos. Not durable by
//! definition; a restart loses everything.

use crate::error::{Result, TicketEngineError};
use crate::store::{CounterDirectory, ServiceCatalog, TicketStore, TicketUpdate};
use crate::types::{Counter, CounterId, Service, ServiceId, Ticket, TicketCode, TicketStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};

#[derive(Default)]
struct Inner {
    tickets: HashMap<String, Ticket>,
    services: Vec<Service>,
    counters: Vec<Counter>,
    /// counter id -> set of service ids it can serve
    capabilities: HashMap<i64, BTreeSet<i64>>,
    next_service_id: i64,
    next_counter_id: i64,
}

/// Map-backed implementation of all three store traits
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service; returns the stored row with its assigned id
    pub fn add_service(&self, tag: &str, name: &str, avg_service_minutes: u32) -> Service {
        let mut inner = self.inner.write();
        inner.next_service_id += 1;
        let service = Service {
            id: ServiceId(inner.next_service_id),
            tag: tag.to_string(),
            name: name.to_string(),
            avg_service_minutes,
        };
        inner.services.push(service.clone());
        service
    }

    /// Register a counter; returns the stored row with its assigned id
    pub fn add_counter(&self, name: &str, is_active: bool) -> Counter {
        let mut inner = self.inner.write();
        inner.next_counter_id += 1;
        let counter = Counter {
            id: CounterId(inner.next_counter_id),
            name: name.to_string(),
            is_active,
        };
        inner.counters.push(counter.clone());
        counter
    }

    /// Grant a counter the capability to serve a service
    pub fn assign_service(&self, counter: CounterId, service: ServiceId) {
        let mut inner = self.inner.write();
        inner.capabilities.entry(counter.0).or_default().insert(service.0);
    }

    /// Flip a counter's active flag
    pub fn set_counter_active(&self, counter: CounterId, is_active: bool) {
        let mut inner = self.inner.write();
        if let Some(c) = inner.counters.iter_mut().find(|c| c.id == counter) {
            c.is_active = is_active;
        }
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn create_ticket(&self, ticket: &Ticket) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.tickets.contains_key(ticket.code.as_str()) {
            return Err(TicketEngineError::DuplicateCode(ticket.code.clone()));
        }
        inner
            .tickets
            .insert(ticket.code.as_str().to_string(), ticket.clone());
        Ok(())
    }

    async fn find_by_code(&self, code: &TicketCode) -> Result<Option<Ticket>> {
        Ok(self.inner.read().tickets.get(code.as_str()).cloned())
    }

    async fn waiting_for_service(&self, service: ServiceId) -> Result<Vec<Ticket>> {
        let inner = self.inner.read();
        let mut waiting: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| t.service_id == service && t.status == TicketStatus::Waiting)
            .cloned()
            .collect();
        waiting.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.code.as_str().cmp(b.code.as_str()))
        });
        Ok(waiting)
    }

    async fn count_created_between(
        &self,
        tag: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        let inner = self.inner.read();
        let service_ids: BTreeSet<i64> = inner
            .services
            .iter()
            .filter(|s| s.tag == tag)
            .map(|s| s.id.0)
            .collect();
        let count = inner
            .tickets
            .values()
            .filter(|t| {
                service_ids.contains(&t.service_id.0)
                    && t.created_at >= from
                    && t.created_at < to
            })
            .count();
        Ok(count as u64)
    }

    async fn update_ticket(&self, code: &TicketCode, update: TicketUpdate) -> Result<()> {
        let mut inner = self.inner.write();
        let ticket = inner
            .tickets
            .get_mut(code.as_str())
            .ok_or_else(|| TicketEngineError::TicketNotFound(code.clone()))?;

        if let Some(status) = update.status {
            ticket.status = status;
        }
        if let Some(counter) = update.counter_id {
            ticket.counter_id = Some(counter);
        }
        if let Some(called_at) = update.called_at {
            ticket.called_at = Some(called_at);
        }
        if let Some(served_at) = update.served_at {
            ticket.served_at = Some(served_at);
        }
        Ok(())
    }

    async fn called_ticket_for_counter(&self, counter: CounterId) -> Result<Option<Ticket>> {
        let inner = self.inner.read();
        Ok(inner
            .tickets
            .values()
            .filter(|t| t.counter_id == Some(counter) && t.status == TicketStatus::Called)
            .max_by_key(|t| t.called_at)
            .cloned())
    }
}

#[async_trait]
impl ServiceCatalog for MemoryStore {
    async fn find_service(&self, id: ServiceId) -> Result<Option<Service>> {
        Ok(self
            .inner
            .read()
            .services
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        let mut services = self.inner.read().services.clone();
        services.sort_by(|a, b| a.tag.cmp(&b.tag));
        Ok(services)
    }
}

#[async_trait]
impl CounterDirectory for MemoryStore {
    async fn find_counter(&self, id: CounterId) -> Result<Option<Counter>> {
        Ok(self
            .inner
            .read()
            .counters
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn supported_services(&self, id: CounterId) -> Result<Vec<Service>> {
        let inner = self.inner.read();
        let Some(capabilities) = inner.capabilities.get(&id.0) else {
            return Ok(Vec::new());
        };
        let mut services: Vec<Service> = inner
            .services
            .iter()
            .filter(|s| capabilities.contains(&s.id.0))
            .cloned()
            .collect();
        services.sort_by(|a, b| a.tag.cmp(&b.tag));
        Ok(services)
    }

    async fn list_counters(&self) -> Result<Vec<Counter>> {
        let mut counters = self.inner.read().counters.clone();
        counters.sort_by_key(|c| c.id);
        Ok(counters)
    }
}
