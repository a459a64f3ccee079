//! In-memory queue index.
//!
//! One ordered sequence of waiting ticket codes per service, mirroring
//! the durable store's WAITING rows. Entries are created lazily: the
//! first touch of a service loads its waiting tickets (oldest first)
//! from the store, after which append and pop are O(1) and never
//! re-query. Each service has its own async mutex so slow I/O on one
//! queue never blocks the others.
//!
//! Invariant: once hydrated, a service's sequence must equal the store's
//! WAITING tickets ordered by creation time. The allocation engine keeps
//! the two in step by holding the service's lock across every paired
//! in-memory/durable mutation.

use crate::error::Result;
use crate::store::TicketStore;
use crate::types::{ServiceId, TicketCode};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// The cached waiting-line for one service.
///
/// Only reachable through [`QueueIndex::hydrated`], which guarantees the
/// sequence has been loaded before handing out the lock.
#[derive(Debug, Default)]
pub struct ServiceQueue {
    hydrated: bool,
    codes: VecDeque<TicketCode>,
}

impl ServiceQueue {
    /// Append a freshly issued code to the tail
    pub fn push_back(&mut self, code: TicketCode) {
        self.codes.push_back(code);
    }

    /// Remove and return the head (oldest) code
    pub fn pop_front(&mut self) -> Option<TicketCode> {
        self.codes.pop_front()
    }

    /// Put a popped code back at the head; used to roll back a pop whose
    /// durable update failed
    pub fn push_front(&mut self, code: TicketCode) {
        self.codes.push_front(code);
    }

    /// Remove a specific code wherever it sits in the line; returns the
    /// position it held so a failed durable update can put it back
    pub fn remove(&mut self, code: &TicketCode) -> Option<usize> {
        let pos = self.codes.iter().position(|c| c == code)?;
        self.codes.remove(pos);
        Some(pos)
    }

    /// Re-insert a code at a given position (clamped to the tail);
    /// the rollback counterpart of [`remove`](Self::remove)
    pub fn insert(&mut self, position: usize, code: TicketCode) {
        let position = position.min(self.codes.len());
        self.codes.insert(position, code);
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Snapshot of the current order, oldest first
    pub fn codes(&self) -> Vec<TicketCode> {
        self.codes.iter().cloned().collect()
    }
}

/// Process-wide index of per-service waiting lines
pub struct QueueIndex {
    store: Arc<dyn TicketStore>,
    queues: DashMap<ServiceId, Arc<Mutex<ServiceQueue>>>,
}

impl QueueIndex {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        QueueIndex {
            store,
            queues: DashMap::new(),
        }
    }

    fn entry(&self, service: ServiceId) -> Arc<Mutex<ServiceQueue>> {
        self.queues
            .entry(service)
            .or_insert_with(|| Arc::new(Mutex::new(ServiceQueue::default())))
            .clone()
    }

    /// Get the service's queue, hydrating it from the store on first
    /// touch. Idempotent; a failed hydration leaves the entry
    /// unhydrated so the next call retries from scratch.
    pub async fn hydrated(&self, service: ServiceId) -> Result<Arc<Mutex<ServiceQueue>>> {
        let queue = self.entry(service);
        {
            let mut guard = queue.lock().await;
            if !guard.hydrated {
                let waiting = self.store.waiting_for_service(service).await?;
                guard.codes = waiting.into_iter().map(|t| t.code).collect();
                guard.hydrated = true;
                debug!(
                    "Hydrated queue for service {} with {} waiting tickets",
                    service,
                    guard.codes.len()
                );
            }
        }
        Ok(queue)
    }

    /// Current length of the service's waiting line (hydrating read)
    pub async fn len(&self, service: ServiceId) -> Result<usize> {
        let queue = self.hydrated(service).await?;
        let guard = queue.lock().await;
        Ok(guard.len())
    }

    /// The service's cache entry if one was ever created, hydrated or
    /// not. Used by callers that need to fix up an already-cached line
    /// without forcing hydration of untouched services.
    pub fn cached(&self, service: ServiceId) -> Option<Arc<Mutex<ServiceQueue>>> {
        self.queues.get(&service).map(|q| q.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TicketEngineError;
    use crate::store::memory::MemoryStore;
    use crate::store::{TicketStore, TicketUpdate};
    use crate::types::{CounterId, Ticket};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store wrapper whose hydration query can be made to fail on demand
    struct FlakyStore {
        inner: MemoryStore,
        fail_loads: AtomicBool,
    }

    #[async_trait]
    impl TicketStore for FlakyStore {
        async fn create_ticket(&self, ticket: &Ticket) -> Result<()> {
            self.inner.create_ticket(ticket).await
        }

        async fn find_by_code(&self, code: &TicketCode) -> Result<Option<Ticket>> {
            self.inner.find_by_code(code).await
        }

        async fn waiting_for_service(&self, service: ServiceId) -> Result<Vec<Ticket>> {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(TicketEngineError::database(
                    "load waiting tickets",
                    "simulated outage",
                ));
            }
            self.inner.waiting_for_service(service).await
        }

        async fn count_created_between(
            &self,
            tag: &str,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<u64> {
            self.inner.count_created_between(tag, from, to).await
        }

        async fn update_ticket(&self, code: &TicketCode, update: TicketUpdate) -> Result<()> {
            self.inner.update_ticket(code, update).await
        }

        async fn called_ticket_for_counter(&self, counter: CounterId) -> Result<Option<Ticket>> {
            self.inner.called_ticket_for_counter(counter).await
        }
    }

    fn seeded_store() -> (Arc<MemoryStore>, ServiceId) {
        let store = Arc::new(MemoryStore::new());
        let service = store.add_service("D", "Deposits", 5);
        (store, service.id)
    }

    async fn enqueue_waiting(store: &MemoryStore, service: ServiceId, code: &str, offset: i64) {
        let ticket = Ticket::waiting(
            TicketCode::from(code),
            service,
            Utc::now() + Duration::seconds(offset),
        );
        store.create_ticket(&ticket).await.unwrap();
    }

    #[tokio::test]
    async fn hydration_loads_waiting_tickets_oldest_first() {
        let (store, service) = seeded_store();
        enqueue_waiting(&store, service, "D-002", 2).await;
        enqueue_waiting(&store, service, "D-001", 1).await;

        let index = QueueIndex::new(store);
        let queue = index.hydrated(service).await.unwrap();
        let guard = queue.lock().await;
        assert_eq!(
            guard.codes(),
            vec![TicketCode::from("D-001"), TicketCode::from("D-002")]
        );
    }

    #[tokio::test]
    async fn hydration_is_idempotent() {
        let (store, service) = seeded_store();
        enqueue_waiting(&store, service, "D-001", 0).await;

        let index = QueueIndex::new(store.clone());
        assert_eq!(index.len(service).await.unwrap(), 1);

        // A ticket created behind the index's back must not appear on a
        // second touch; hydration only happens once.
        enqueue_waiting(&store, service, "D-002", 1).await;
        assert_eq!(index.len(service).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_service_hydrates_to_empty() {
        let (store, _) = seeded_store();
        let index = QueueIndex::new(store);
        assert_eq!(index.len(ServiceId(42)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_hydration_is_retried() {
        let flaky = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_loads: AtomicBool::new(true),
        });
        let flaky_service = flaky.inner.add_service("D", "Deposits", 5).id;
        enqueue_waiting(&flaky.inner, flaky_service, "D-001", 0).await;

        let index = QueueIndex::new(flaky.clone());
        let err = index.hydrated(flaky_service).await.unwrap_err();
        assert!(matches!(err, TicketEngineError::Database { .. }));

        // Outage over: the entry was left unhydrated, so this retries
        flaky.fail_loads.store(false, Ordering::SeqCst);
        assert_eq!(index.len(flaky_service).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn append_and_pop_preserve_fifo() {
        let (store, service) = seeded_store();
        let index = QueueIndex::new(store);

        let queue = index.hydrated(service).await.unwrap();
        {
            let mut guard = queue.lock().await;
            guard.push_back(TicketCode::from("D-001"));
            guard.push_back(TicketCode::from("D-002"));
            guard.push_back(TicketCode::from("D-003"));
        }

        let mut guard = queue.lock().await;
        assert_eq!(guard.pop_front(), Some(TicketCode::from("D-001")));
        assert_eq!(guard.pop_front(), Some(TicketCode::from("D-002")));
        // A rolled-back pop goes back to the head
        guard.push_front(TicketCode::from("D-002"));
        assert_eq!(guard.pop_front(), Some(TicketCode::from("D-002")));
        assert_eq!(guard.pop_front(), Some(TicketCode::from("D-003")));
        assert_eq!(guard.pop_front(), None);
    }

    #[tokio::test]
    async fn cached_entries_appear_only_after_first_touch() {
        let (store, service) = seeded_store();
        enqueue_waiting(&store, service, "D-001", 0).await;
        let index = QueueIndex::new(store);

        assert!(index.cached(service).is_none());

        index.hydrated(service).await.unwrap();
        let queue = index.cached(service).expect("entry after hydration");
        let mut guard = queue.lock().await;
        assert!(guard.is_hydrated());
        assert_eq!(guard.remove(&TicketCode::from("D-001")), Some(0));
        assert_eq!(guard.remove(&TicketCode::from("D-001")), None);
    }

    #[tokio::test]
    async fn remove_and_insert_restore_the_original_order() {
        let (store, service) = seeded_store();
        let index = QueueIndex::new(store);

        let queue = index.hydrated(service).await.unwrap();
        let mut guard = queue.lock().await;
        for code in ["D-001", "D-002", "D-003"] {
            guard.push_back(TicketCode::from(code));
        }

        let pos = guard.remove(&TicketCode::from("D-002")).unwrap();
        assert_eq!(pos, 1);
        guard.insert(pos, TicketCode::from("D-002"));
        assert_eq!(
            guard.codes(),
            vec![
                TicketCode::from("D-001"),
                TicketCode::from("D-002"),
                TicketCode::from("D-003"),
            ]
        );
    }
}
