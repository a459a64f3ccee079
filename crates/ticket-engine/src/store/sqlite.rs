//! SQLite-backed store.
//!
//! All three store seams implemented over a single pooled SQLite
//! database with sqlx. Queries are bound at runtime; the schema is
//! bootstrapped on connect so `:memory:` databases work out of the box
//! in tests and demos.

use crate::error::{Result, TicketEngineError};
use crate::store::{CounterDirectory, ServiceCatalog, TicketStore, TicketUpdate};
use crate::types::{Counter, CounterId, Service, ServiceId, Ticket, TicketCode, TicketStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, SqlitePool};
use tracing::{debug, info};

/// Pooled SQLite implementation of the store traits
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS services (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tag TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    avg_service_minutes INTEGER NOT NULL DEFAULT 5
);

CREATE TABLE IF NOT EXISTS counters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS counter_services (
    counter_id INTEGER NOT NULL REFERENCES counters(id),
    service_id INTEGER NOT NULL REFERENCES services(id),
    PRIMARY KEY (counter_id, service_id)
);

CREATE TABLE IF NOT EXISTS tickets (
    code TEXT PRIMARY KEY,
    service_id INTEGER NOT NULL REFERENCES services(id),
    status TEXT NOT NULL DEFAULT 'WAITING',
    counter_id INTEGER,
    created_at TEXT NOT NULL,
    called_at TEXT,
    served_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_tickets_service_status
    ON tickets(service_id, status, created_at);
"#;

impl SqliteStore {
    /// Connect to the database and bootstrap the schema.
    ///
    /// In-memory URLs are pinned to a single pool connection: every
    /// SQLite `:memory:` connection is its own database, so a wider pool
    /// would scatter rows across invisible databases.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            max_connections
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| TicketEngineError::database("connect", e))?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| TicketEngineError::database("bootstrap schema", e))?;

        info!("Ticket store ready at {}", database_url);
        Ok(SqliteStore { pool })
    }

    /// The underlying pool, for callers that need direct access
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Register a service; returns the stored row with its assigned id
    pub async fn add_service(&self, tag: &str, name: &str, avg_service_minutes: u32) -> Result<Service> {
        let result = sqlx::query(
            "INSERT INTO services (tag, name, avg_service_minutes) VALUES (?, ?, ?)",
        )
        .bind(tag)
        .bind(name)
        .bind(avg_service_minutes as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| TicketEngineError::database("add service", e))?;

        Ok(Service {
            id: ServiceId(result.last_insert_rowid()),
            tag: tag.to_string(),
            name: name.to_string(),
            avg_service_minutes,
        })
    }

    /// Register a counter; returns the stored row with its assigned id
    pub async fn add_counter(&self, name: &str, is_active: bool) -> Result<Counter> {
        let result = sqlx::query("INSERT INTO counters (name, is_active) VALUES (?, ?)")
            .bind(name)
            .bind(is_active)
            .execute(&self.pool)
            .await
            .map_err(|e| TicketEngineError::database("add counter", e))?;

        Ok(Counter {
            id: CounterId(result.last_insert_rowid()),
            name: name.to_string(),
            is_active,
        })
    }

    /// Grant a counter the capability to serve a service
    pub async fn assign_service(&self, counter: CounterId, service: ServiceId) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO counter_services (counter_id, service_id) VALUES (?, ?)")
            .bind(counter.0)
            .bind(service.0)
            .execute(&self.pool)
            .await
            .map_err(|e| TicketEngineError::database("assign service", e))?;
        Ok(())
    }

    /// Flip a counter's active flag
    pub async fn set_counter_active(&self, counter: CounterId, is_active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE counters SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(counter.0)
            .execute(&self.pool)
            .await
            .map_err(|e| TicketEngineError::database("set counter active", e))?;

        if result.rows_affected() == 0 {
            return Err(TicketEngineError::CounterNotFound(counter));
        }
        Ok(())
    }
}

fn row_to_ticket(row: &SqliteRow) -> Result<Ticket> {
    let status_str: String = row
        .try_get("status")
        .map_err(|e| TicketEngineError::database("read ticket row", e))?;
    let status = TicketStatus::parse(&status_str).ok_or_else(|| {
        TicketEngineError::Internal(format!("unknown ticket status in store: {}", status_str))
    })?;

    let read = |e: sqlx::Error| TicketEngineError::database("read ticket row", e);

    Ok(Ticket {
        code: TicketCode::new(row.try_get::<String, _>("code").map_err(read)?),
        service_id: ServiceId(row.try_get("service_id").map_err(read)?),
        status,
        counter_id: row
            .try_get::<Option<i64>, _>("counter_id")
            .map_err(read)?
            .map(CounterId),
        created_at: row.try_get("created_at").map_err(read)?,
        called_at: row.try_get("called_at").map_err(read)?,
        served_at: row.try_get("served_at").map_err(read)?,
    })
}

fn row_to_service(row: &SqliteRow) -> Result<Service> {
    let read = |e: sqlx::Error| TicketEngineError::database("read service row", e);
    Ok(Service {
        id: ServiceId(row.try_get("id").map_err(read)?),
        tag: row.try_get("tag").map_err(read)?,
        name: row.try_get("name").map_err(read)?,
        avg_service_minutes: row.try_get::<i64, _>("avg_service_minutes").map_err(read)? as u32,
    })
}

fn row_to_counter(row: &SqliteRow) -> Result<Counter> {
    let read = |e: sqlx::Error| TicketEngineError::database("read counter row", e);
    Ok(Counter {
        id: CounterId(row.try_get("id").map_err(read)?),
        name: row.try_get("name").map_err(read)?,
        is_active: row.try_get("is_active").map_err(read)?,
    })
}

#[async_trait]
impl TicketStore for SqliteStore {
    async fn create_ticket(&self, ticket: &Ticket) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO tickets (code, service_id, status, counter_id, created_at, called_at, served_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(ticket.code.as_str())
        .bind(ticket.service_id.0)
        .bind(ticket.status.as_str())
        .bind(ticket.counter_id.map(|c| c.0))
        .bind(ticket.created_at)
        .bind(ticket.called_at)
        .bind(ticket.served_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!("Persisted ticket {}", ticket.code);
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(TicketEngineError::DuplicateCode(ticket.code.clone()))
            }
            Err(e) => Err(TicketEngineError::database("create ticket", e)),
        }
    }

    async fn find_by_code(&self, code: &TicketCode) -> Result<Option<Ticket>> {
        let row = sqlx::query("SELECT * FROM tickets WHERE code = ?")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TicketEngineError::database("find ticket", e))?;

        row.as_ref().map(row_to_ticket).transpose()
    }

    async fn waiting_for_service(&self, service: ServiceId) -> Result<Vec<Ticket>> {
        let rows = sqlx::query(
            "SELECT * FROM tickets
             WHERE service_id = ? AND status = 'WAITING'
             ORDER BY created_at ASC, code ASC",
        )
        .bind(service.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TicketEngineError::database("load waiting tickets", e))?;

        rows.iter().map(row_to_ticket).collect()
    }

    async fn count_created_between(
        &self,
        tag: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets t
             JOIN services s ON s.id = t.service_id
             WHERE s.tag = ? AND t.created_at >= ? AND t.created_at < ?",
        )
        .bind(tag)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TicketEngineError::database("count tickets for tag", e))?;

        Ok(count as u64)
    }

    async fn update_ticket(&self, code: &TicketCode, update: TicketUpdate) -> Result<()> {
        if update == TicketUpdate::default() {
            return Ok(());
        }

        let mut qb: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE tickets SET ");
        let mut fields = qb.separated(", ");
        if let Some(status) = update.status {
            fields.push("status = ").push_bind_unseparated(status.as_str());
        }
        if let Some(counter) = update.counter_id {
            fields.push("counter_id = ").push_bind_unseparated(counter.0);
        }
        if let Some(called_at) = update.called_at {
            fields.push("called_at = ").push_bind_unseparated(called_at);
        }
        if let Some(served_at) = update.served_at {
            fields.push("served_at = ").push_bind_unseparated(served_at);
        }
        qb.push(" WHERE code = ").push_bind(code.as_str());

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| TicketEngineError::database("update ticket", e))?;

        if result.rows_affected() == 0 {
            return Err(TicketEngineError::TicketNotFound(code.clone()));
        }
        Ok(())
    }

    async fn called_ticket_for_counter(&self, counter: CounterId) -> Result<Option<Ticket>> {
        let row = sqlx::query(
            "SELECT * FROM tickets
             WHERE counter_id = ? AND status = 'CALLED'
             ORDER BY called_at DESC LIMIT 1",
        )
        .bind(counter.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TicketEngineError::database("find called ticket", e))?;

        row.as_ref().map(row_to_ticket).transpose()
    }
}

#[async_trait]
impl ServiceCatalog for SqliteStore {
    async fn find_service(&self, id: ServiceId) -> Result<Option<Service>> {
        let row = sqlx::query("SELECT * FROM services WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TicketEngineError::database("find service", e))?;

        row.as_ref().map(row_to_service).transpose()
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        let rows = sqlx::query("SELECT * FROM services ORDER BY tag ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TicketEngineError::database("list services", e))?;

        rows.iter().map(row_to_service).collect()
    }
}

#[async_trait]
impl CounterDirectory for SqliteStore {
    async fn find_counter(&self, id: CounterId) -> Result<Option<Counter>> {
        let row = sqlx::query("SELECT * FROM counters WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TicketEngineError::database("find counter", e))?;

        row.as_ref().map(row_to_counter).transpose()
    }

    async fn supported_services(&self, id: CounterId) -> Result<Vec<Service>> {
        let rows = sqlx::query(
            "SELECT s.* FROM services s
             JOIN counter_services cs ON cs.service_id = s.id
             WHERE cs.counter_id = ?
             ORDER BY s.tag ASC",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TicketEngineError::database("list supported services", e))?;

        rows.iter().map(row_to_service).collect()
    }

    async fn list_counters(&self) -> Result<Vec<Counter>> {
        let rows = sqlx::query("SELECT * FROM counters ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TicketEngineError::database("list counters", e))?;

        rows.iter().map(row_to_counter).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:", 5).await.unwrap()
    }

    #[tokio::test]
    async fn schema_bootstrap_allows_reconnect_idempotently() {
        let store = memory_store().await;
        // Re-running the schema against the same pool must be harmless
        sqlx::raw_sql(SCHEMA).execute(store.pool()).await.unwrap();
    }

    #[tokio::test]
    async fn create_and_find_round_trip() {
        let store = memory_store().await;
        let service = store.add_service("D", "Deposits", 5).await.unwrap();

        let ticket = Ticket::waiting(TicketCode::from("D-001"), service.id, Utc::now());
        store.create_ticket(&ticket).await.unwrap();

        let found = store.find_by_code(&ticket.code).await.unwrap().unwrap();
        assert_eq!(found.code, ticket.code);
        assert_eq!(found.status, TicketStatus::Waiting);
        assert!(found.counter_id.is_none());
    }

    #[tokio::test]
    async fn duplicate_code_is_a_conflict() {
        let store = memory_store().await;
        let service = store.add_service("D", "Deposits", 5).await.unwrap();

        let ticket = Ticket::waiting(TicketCode::from("D-001"), service.id, Utc::now());
        store.create_ticket(&ticket).await.unwrap();

        let err = store.create_ticket(&ticket).await.unwrap_err();
        assert!(matches!(err, TicketEngineError::DuplicateCode(_)));
    }

    #[tokio::test]
    async fn waiting_list_is_ordered_and_filtered() {
        let store = memory_store().await;
        let service = store.add_service("D", "Deposits", 5).await.unwrap();
        let other = store.add_service("L", "Loans", 10).await.unwrap();

        let base = Utc::now();
        for (code, offset) in [("D-002", 2), ("D-001", 1), ("D-003", 3)] {
            let ticket = Ticket::waiting(
                TicketCode::from(code),
                service.id,
                base + chrono::Duration::seconds(offset),
            );
            store.create_ticket(&ticket).await.unwrap();
        }
        // Different service and non-waiting rows must not show up
        store
            .create_ticket(&Ticket::waiting(TicketCode::from("L-001"), other.id, base))
            .await
            .unwrap();
        store
            .update_ticket(
                &TicketCode::from("D-002"),
                TicketUpdate::called(CounterId(1), Utc::now()),
            )
            .await
            .unwrap();

        let waiting = store.waiting_for_service(service.id).await.unwrap();
        let codes: Vec<&str> = waiting.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(codes, vec!["D-001", "D-003"]);
    }

    #[tokio::test]
    async fn count_window_is_half_open() {
        let store = memory_store().await;
        let service = store.add_service("D", "Deposits", 5).await.unwrap();

        let from = Utc::now();
        let to = from + chrono::Duration::hours(1);

        store
            .create_ticket(&Ticket::waiting(TicketCode::from("D-001"), service.id, from))
            .await
            .unwrap();
        store
            .create_ticket(&Ticket::waiting(TicketCode::from("D-002"), service.id, to))
            .await
            .unwrap();

        // Lower bound inclusive, upper bound exclusive
        assert_eq!(store.count_created_between("D", from, to).await.unwrap(), 1);
        assert_eq!(store.count_created_between("X", from, to).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_unknown_code_is_not_found() {
        let store = memory_store().await;
        let err = store
            .update_ticket(&TicketCode::from("Z-999"), TicketUpdate::served(Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, TicketEngineError::TicketNotFound(_)));
    }

    #[tokio::test]
    async fn counter_capabilities_round_trip() {
        let store = memory_store().await;
        let deposits = store.add_service("D", "Deposits", 5).await.unwrap();
        let loans = store.add_service("L", "Loans", 10).await.unwrap();
        let counter = store.add_counter("Counter 1", true).await.unwrap();

        store.assign_service(counter.id, loans.id).await.unwrap();
        store.assign_service(counter.id, deposits.id).await.unwrap();

        let services = store.supported_services(counter.id).await.unwrap();
        let tags: Vec<&str> = services.iter().map(|s| s.tag.as_str()).collect();
        assert_eq!(tags, vec!["D", "L"]);

        store.set_counter_active(counter.id, false).await.unwrap();
        let counter = store.find_counter(counter.id).await.unwrap().unwrap();
        assert!(!counter.is_active);
    }

    #[tokio::test]
    async fn called_ticket_lookup_sees_only_called_status() {
        let store = memory_store().await;
        let service = store.add_service("D", "Deposits", 5).await.unwrap();
        let counter = store.add_counter("Counter 1", true).await.unwrap();

        let ticket = Ticket::waiting(TicketCode::from("D-001"), service.id, Utc::now());
        store.create_ticket(&ticket).await.unwrap();
        assert!(store
            .called_ticket_for_counter(counter.id)
            .await
            .unwrap()
            .is_none());

        store
            .update_ticket(&ticket.code, TicketUpdate::called(counter.id, Utc::now()))
            .await
            .unwrap();
        let called = store
            .called_ticket_for_counter(counter.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(called.code, ticket.code);

        store
            .update_ticket(&ticket.code, TicketUpdate::served(Utc::now()))
            .await
            .unwrap();
        assert!(store
            .called_ticket_for_counter(counter.id)
            .await
            .unwrap()
            .is_none());
    }
}
