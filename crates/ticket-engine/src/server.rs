//! # Ticket Hall Server
//!
//! High-level server wrapper around the allocation engine: builds the
//! engine over a SQLite store, hands out the role-scoped APIs, runs a
//! background monitoring task, and offers seed helpers for demos and
//! tests. This is the entry point a deployment binary talks to; the
//! engine itself stays free of lifecycle concerns.
//!
//! ## Examples
//!
//! ```no_run
//! use tellerq_ticket_engine::config::EngineConfig;
//! use tellerq_ticket_engine::server::TicketHallServerBuilder;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut server = TicketHallServerBuilder::new()
//!     .with_config(EngineConfig::default())
//!     .with_in_memory_database()
//!     .build()
//!     .await?;
//!
//! server.create_default_services().await?;
//! server.start().await?;
//!
//! let receipt = server.kiosk_api().take_ticket(
//!     server.supervisor_api().queue_status().await?[0].service_id,
//! ).await?;
//! println!("ticket {}", receipt.code);
//!
//! server.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep};
use tracing::{error, info};

use crate::api::{ClerkApi, KioskApi, SupervisorApi};
use crate::config::EngineConfig;
use crate::engine::AllocationEngine;
use crate::error::{Result, TicketEngineError};
use crate::store::SqliteStore;
use crate::types::{Counter, Service};

/// A complete ticket hall server managing engine lifecycle and APIs
pub struct TicketHallServer {
    /// The core allocation engine
    engine: Arc<AllocationEngine>,

    /// Concrete store handle, kept for seeding and administration
    store: Arc<SqliteStore>,

    /// Role-scoped APIs
    kiosk_api: KioskApi,
    clerk_api: ClerkApi,
    supervisor_api: SupervisorApi,

    /// Server configuration
    config: EngineConfig,

    /// Optional handle to the monitoring task
    monitor_handle: Option<JoinHandle<()>>,
}

impl TicketHallServer {
    /// Create a server over the configured SQLite database
    pub async fn new(config: EngineConfig) -> Result<Self> {
        let store = Arc::new(
            SqliteStore::new(
                &config.database.database_url,
                config.database.max_connections,
            )
            .await?,
        );

        let engine = AllocationEngine::new(
            config.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        );

        let kiosk_api = KioskApi::new(engine.clone());
        let clerk_api = ClerkApi::new(engine.clone());
        let supervisor_api = SupervisorApi::new(engine.clone());

        info!("✅ Ticket hall '{}' initialized", config.general.hall_name);

        Ok(Self {
            engine,
            store,
            kiosk_api,
            clerk_api,
            supervisor_api,
            config,
            monitor_handle: None,
        })
    }

    /// Create a server with an in-memory database
    pub async fn new_in_memory(mut config: EngineConfig) -> Result<Self> {
        config.database.database_url = "sqlite::memory:".to_string();
        Self::new(config).await
    }

    /// Start background operations
    pub async fn start(&mut self) -> Result<()> {
        if self.config.monitor.interval_secs > 0 {
            let supervisor_api = self.supervisor_api.clone();
            let interval_secs = self.config.monitor.interval_secs;
            let handle = tokio::spawn(async move {
                Self::monitor_loop(supervisor_api, interval_secs).await;
            });
            self.monitor_handle = Some(handle);
            info!("✅ Started queue monitor");
        }
        Ok(())
    }

    /// Stop the server gracefully
    pub async fn stop(&mut self) -> Result<()> {
        info!("🛑 Stopping ticket hall server...");

        if let Some(handle) = self.monitor_handle.take() {
            handle.abort();
            let _ = handle.await;
        }

        info!("✅ Ticket hall server stopped");
        Ok(())
    }

    /// Run the server indefinitely, logging periodic stats
    pub async fn run(&self) -> Result<()> {
        info!("🎫 Ticket hall '{}' is running", self.config.general.hall_name);

        loop {
            sleep(Duration::from_secs(60)).await;

            match self.supervisor_api.stats().await {
                Ok(stats) => info!(
                    "📊 Stats - Waiting: {}, Services: {}, Counters: {}/{} active",
                    stats.total_waiting, stats.services, stats.active_counters, stats.counters
                ),
                Err(e) => error!("Failed to get engine stats: {}", e),
            }
        }
    }

    /// Get the customer-facing API
    pub fn kiosk_api(&self) -> &KioskApi {
        &self.kiosk_api
    }

    /// Get the counter-facing API
    pub fn clerk_api(&self) -> &ClerkApi {
        &self.clerk_api
    }

    /// Get the monitoring API
    pub fn supervisor_api(&self) -> &SupervisorApi {
        &self.supervisor_api
    }

    /// Get a reference to the engine (for advanced usage)
    pub fn engine(&self) -> &Arc<AllocationEngine> {
        &self.engine
    }

    /// Get the concrete store handle (for administration)
    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    /// Internal monitoring loop
    async fn monitor_loop(supervisor_api: SupervisorApi, interval_secs: u64) {
        let mut ticker = interval(Duration::from_secs(interval_secs));

        loop {
            ticker.tick().await;

            match supervisor_api.queue_status().await {
                Ok(entries) => {
                    let total: usize = entries.iter().map(|e| e.queue_length).sum();
                    info!("📋 {} tickets waiting across {} services", total, entries.len());
                    for entry in entries.iter().filter(|e| e.queue_length > 0) {
                        info!(
                            "  📋 {} ({}): {} waiting, ~{} min",
                            entry.service_tag,
                            entry.service_name,
                            entry.queue_length,
                            entry.estimated_wait_minutes
                        );
                    }
                }
                Err(e) => error!("Failed to get queue status: {}", e),
            }

            match supervisor_api.list_counters().await {
                Ok(counters) => {
                    let active = counters.iter().filter(|c| c.is_active).count();
                    info!("🧑‍💼 Counters: {} active of {}", active, counters.len());
                }
                Err(e) => error!("Failed to list counters: {}", e),
            }
        }
    }

    /// Seed the standard service catalog (for examples/testing)
    pub async fn create_default_services(&self) -> Result<Vec<Service>> {
        let specs = [
            ("D", "Deposits", 5),
            ("W", "Withdrawals", 4),
            ("L", "Loans", 15),
            ("A", "Accounts", 10),
        ];

        let mut services = Vec::with_capacity(specs.len());
        for (tag, name, avg_minutes) in specs {
            let service = self.store.add_service(tag, name, avg_minutes).await?;
            info!("✅ Created service: {} ({})", tag, name);
            services.push(service);
        }
        Ok(services)
    }

    /// Seed counters with capability sets given as service tags
    /// (for examples/testing)
    pub async fn create_test_counters(
        &self,
        counters: Vec<(&str, Vec<&str>)>,
    ) -> Result<Vec<Counter>> {
        use crate::store::ServiceCatalog;

        let services = self.store.list_services().await?;
        let mut created = Vec::with_capacity(counters.len());

        for (name, tags) in counters {
            let counter = self.store.add_counter(name, true).await?;
            for tag in tags {
                let service = services.iter().find(|s| s.tag == tag).ok_or_else(|| {
                    TicketEngineError::Configuration(format!(
                        "Cannot assign unknown service tag '{}' to counter {}",
                        tag, name
                    ))
                })?;
                self.store.assign_service(counter.id, service.id).await?;
            }
            info!("✅ Created counter: {}", name);
            created.push(counter);
        }
        Ok(created)
    }
}

/// Builder for TicketHallServer with fluent API
pub struct TicketHallServerBuilder {
    config: Option<EngineConfig>,
    database_url: Option<String>,
}

impl TicketHallServerBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: None,
            database_url: None,
        }
    }

    /// Set the configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the database URL
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Use an in-memory database
    pub fn with_in_memory_database(mut self) -> Self {
        self.database_url = Some("sqlite::memory:".to_string());
        self
    }

    /// Build the server
    pub async fn build(self) -> Result<TicketHallServer> {
        let mut config = self.config.unwrap_or_default();
        if let Some(url) = self.database_url {
            config.database.database_url = url;
        }
        TicketHallServer::new(config).await
    }
}

impl Default for TicketHallServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
