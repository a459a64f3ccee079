//! # Ticket Engine
//!
//! Queue allocation and ticket dispatch engine for walk-in service
//! halls. Customers take sequential tickets per service type, staffed
//! counters pull the next appropriate ticket by queue pressure and
//! capability, and a per-service in-memory index keeps "who is next"
//! answerable without a database round-trip.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │              TicketHallServer                 │
//! ├───────────────────────────────────────────────┤
//! │   KioskApi  │   ClerkApi   │  SupervisorApi   │
//! ├───────────────────────────────────────────────┤
//! │              AllocationEngine                 │
//! │   QueueIndex  │  TicketCodeGenerator          │
//! ├───────────────────────────────────────────────┤
//! │  TicketStore │ ServiceCatalog │ CounterDir.   │
//! │        (SqliteStore / MemoryStore)            │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! The engine is created once at process start with its dependencies
//! injected and shared as an `Arc` by every request handler; all queue
//! mutations run inside per-service critical sections so concurrent
//! enqueue/dispatch traffic cannot produce duplicate codes or lost
//! updates.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tellerq_ticket_engine::prelude::*;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut server = TicketHallServerBuilder::new()
//!     .with_config(EngineConfig::default())
//!     .with_in_memory_database()
//!     .build()
//!     .await?;
//!
//! let services = server.create_default_services().await?;
//! server
//!     .create_test_counters(vec![("Counter 1", vec!["D", "W"])])
//!     .await?;
//! server.start().await?;
//!
//! // Customer takes a ticket
//! let receipt = server.kiosk_api().take_ticket(services[0].id).await?;
//! println!("Your ticket: {}", receipt.code);
//!
//! // Counter pulls the next customer
//! let counters = server.supervisor_api().list_counters().await?;
//! if let Some(called) = server.clerk_api().next_ticket(counters[0].id).await? {
//!     println!("Now serving: {}", called.code);
//!     server.clerk_api().complete_ticket(&called.code).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod codegen;
pub mod config;
pub mod engine;
pub mod error;
pub mod prelude;
pub mod queue;
pub mod server;
pub mod store;
pub mod types;

// Export the main engine type
pub use engine::AllocationEngine;

// Export the error type and result alias
pub use error::{Result, TicketEngineError};

// Export configuration
pub use config::EngineConfig;

// Export the server wrapper
pub use server::{TicketHallServer, TicketHallServerBuilder};
