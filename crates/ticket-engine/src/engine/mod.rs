//! # Allocation Engine
//!
//! The coordination core of the ticket hall: issues tickets to
//! customers, dispatches the next appropriate ticket to counters, and
//! reports queue state. One engine instance exists per process, created
//! at startup with its store/catalog/directory dependencies injected and
//! shared as `Arc<AllocationEngine>` by every request handler.
//!
//! ## Module Organization
//!
//! - **[`core`]**: engine construction, dependency wiring, statistics
//! - **[`enqueue`]**: customer-facing ticket issue
//! - **[`dispatch`]**: counter-facing next-ticket selection
//! - **[`status`]**: ticket completion and queue status reporting
//!
//! ## Concurrency
//!
//! Every mutation runs inside a per-service critical section: the tag
//! lock covers count-then-create during code generation, and the
//! service's queue lock covers each paired in-memory/durable mutation
//! (persist + append on enqueue, pop + mark-called on dispatch). Locks
//! are per service, so I/O on one queue never stalls the others.

pub mod core;
pub mod dispatch;
pub mod enqueue;
pub mod status;

pub use core::AllocationEngine;
