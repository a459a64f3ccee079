//! Ticket code generation.
//!
//! Codes look like `D-007`: the service tag, a dash, and the ticket's
//! sequence number within the tag's calendar day, zero-padded to a
//! configurable minimum width. The sequence is derived by counting the
//! tag's tickets created today in the durable store, which is only safe
//! when count-then-create runs inside the tag's critical section —
//! callers take [`TicketCodeGenerator::lock_tag`] first and hold the
//! guard until the ticket row is persisted. The store's uniqueness
//! constraint on `code` remains as a backstop and surfaces as a
//! `DuplicateCode` conflict the caller may retry.

use crate::error::{Result, TicketEngineError};
use crate::store::TicketStore;
use crate::types::TicketCode;
use chrono::{DateTime, Local, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Generates daily-sequential, human-readable ticket codes
pub struct TicketCodeGenerator {
    store: Arc<dyn TicketStore>,
    min_digits: usize,
    tag_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TicketCodeGenerator {
    pub fn new(store: Arc<dyn TicketStore>, min_digits: usize) -> Self {
        TicketCodeGenerator {
            store,
            min_digits,
            tag_locks: DashMap::new(),
        }
    }

    /// Acquire the tag's critical section.
    ///
    /// Hold the returned guard across [`next_code`](Self::next_code) and
    /// the subsequent ticket insert; releasing it earlier re-opens the
    /// count-then-create race.
    pub async fn lock_tag(&self, tag: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .tag_locks
            .entry(tag.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Produce the next code for a tag based on today's ticket count.
    /// Caller must hold the tag's lock (see [`lock_tag`](Self::lock_tag)).
    pub async fn next_code(&self, tag: &str) -> Result<TicketCode> {
        let (from, to) = day_window(Utc::now())?;
        let count = self.store.count_created_between(tag, from, to).await?;
        Ok(self.format_code(tag, count + 1))
    }

    /// Render a sequence number as a code; padding never truncates
    pub fn format_code(&self, tag: &str, sequence: u64) -> TicketCode {
        TicketCode::new(format!("{}-{:0width$}", tag, sequence, width = self.min_digits))
    }
}

/// The UTC bounds of the local calendar day containing `now`, as a
/// half-open `[start, next_start)` interval.
///
/// DST-ambiguous midnights resolve to the earliest valid instant, so the
/// window is always well defined.
pub fn day_window(now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let local_day = now.with_timezone(&Local).date_naive();
    let next_day = local_day
        .succ_opt()
        .ok_or_else(|| TicketEngineError::Internal("calendar overflow".to_string()))?;

    let to_utc = |day: chrono::NaiveDate| -> Result<DateTime<Utc>> {
        let midnight = day
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| TicketEngineError::Internal("invalid midnight".to_string()))?;
        midnight
            .and_local_timezone(Local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| {
                TicketEngineError::Internal(format!("no valid local midnight for {}", day))
            })
    };

    Ok((to_utc(local_day)?, to_utc(next_day)?))
}
