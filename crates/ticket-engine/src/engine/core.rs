//! Engine construction and shared state.

use crate::codegen::TicketCodeGenerator;
use crate::config::EngineConfig;
use crate::error::{Result, TicketEngineError};
use crate::queue::QueueIndex;
use crate::store::{CounterDirectory, ServiceCatalog, TicketStore};
use crate::types::{Counter, CounterId, EngineStats, Service, ServiceId};
use std::sync::Arc;
use tracing::info;

/// The queue allocation engine.
///
/// Owns the in-memory queue index and the code generator; everything
/// durable goes through the injected store traits. Cheap to share: wrap
/// it in an `Arc` once and hand clones to request handlers.
pub struct AllocationEngine {
    config: EngineConfig,
    store: Arc<dyn TicketStore>,
    catalog: Arc<dyn ServiceCatalog>,
    counters: Arc<dyn CounterDirectory>,
    pub(crate) queues: QueueIndex,
    pub(crate) code_gen: TicketCodeGenerator,
}

impl AllocationEngine {
    /// Create the engine with injected dependencies.
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn TicketStore>,
        catalog: Arc<dyn ServiceCatalog>,
        counters: Arc<dyn CounterDirectory>,
    ) -> Arc<Self> {
        let queues = QueueIndex::new(store.clone());
        let code_gen = TicketCodeGenerator::new(store.clone(), config.codes.min_sequence_digits);

        info!(
            "Allocation engine ready for hall '{}' (direct serve: {}, exclusive called: {})",
            config.general.hall_name,
            config.completion.allow_direct_serve,
            config.dispatch.exclusive_called,
        );

        Arc::new(AllocationEngine {
            config,
            store,
            catalog,
            counters,
            queues,
            code_gen,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &Arc<dyn TicketStore> {
        &self.store
    }

    /// Resolve a service or fail with the not-found condition
    pub(crate) async fn resolve_service(&self, id: ServiceId) -> Result<Service> {
        self.catalog
            .find_service(id)
            .await?
            .ok_or(TicketEngineError::ServiceNotFound(id))
    }

    /// Resolve a counter or fail with the not-found condition
    pub(crate) async fn resolve_counter(&self, id: CounterId) -> Result<Counter> {
        self.counters
            .find_counter(id)
            .await?
            .ok_or(TicketEngineError::CounterNotFound(id))
    }

    pub(crate) async fn list_services(&self) -> Result<Vec<Service>> {
        self.catalog.list_services().await
    }

    pub(crate) async fn supported_services(&self, id: CounterId) -> Result<Vec<Service>> {
        self.counters.supported_services(id).await
    }

    /// All counters, for monitoring surfaces
    pub async fn list_counters(&self) -> Result<Vec<Counter>> {
        self.counters.list_counters().await
    }

    /// Aggregate statistics for monitoring
    pub async fn stats(&self) -> Result<EngineStats> {
        let services = self.catalog.list_services().await?;
        let counters = self.counters.list_counters().await?;

        let mut total_waiting = 0;
        for service in &services {
            total_waiting += self.queues.len(service.id).await?;
        }

        Ok(EngineStats {
            total_waiting,
            services: services.len(),
            active_counters: counters.iter().filter(|c| c.is_active).count(),
            counters: counters.len(),
        })
    }
}
