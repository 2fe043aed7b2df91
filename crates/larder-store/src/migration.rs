//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;
use tracing::info;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Counter row holding the next item id.
pub const ITEM_COUNTER: &str = "item";

/// Counter row holding the next request id.
pub const REQUEST_COUNTER: &str = "request";

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        info!(from = current, to = CURRENT_VERSION, "migrated ledger schema");
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Registered producers. Presence of a row is the registration flag.
        CREATE TABLE producers (
            identity BLOB PRIMARY KEY,        -- 32 bytes, Ed25519 public key
            item_count INTEGER NOT NULL,
            reputation INTEGER NOT NULL,
            profile_digest BLOB NOT NULL,     -- 32 bytes, Blake3 of canonical profile
            registered_at INTEGER NOT NULL
        );

        -- Published items. Never deleted.
        CREATE TABLE items (
            item_id INTEGER PRIMARY KEY,
            owner BLOB NOT NULL,
            is_public INTEGER NOT NULL,       -- 0 or 1, only ever goes 0 -> 1
            price BLOB NOT NULL,              -- 8 bytes, big-endian u64
            published_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- Access requests and their escrow. Never deleted.
        CREATE TABLE access_requests (
            request_id INTEGER PRIMARY KEY,
            item_id INTEGER NOT NULL REFERENCES items(item_id),
            requester BLOB NOT NULL,
            amount BLOB NOT NULL,             -- 8 bytes, big-endian u64
            state INTEGER NOT NULL,           -- 0=pending, 1=granted, 2=denied
            escrow_state INTEGER NOT NULL,    -- 0=held, 1=releasing, 2=released
            escrow_recipient BLOB,            -- set once escrow leaves held
            created_at INTEGER NOT NULL,
            resolved_at INTEGER
        );

        -- Monotonic id counters
        CREATE TABLE counters (
            name TEXT PRIMARY KEY,
            next_value INTEGER NOT NULL
        );

        INSERT INTO counters (name, next_value) VALUES ('item', 1), ('request', 1);

        -- Indexes for common queries
        CREATE INDEX idx_items_owner ON items(owner);
        CREATE INDEX idx_requests_item ON access_requests(item_id);
        CREATE INDEX idx_requests_requester ON access_requests(requester, item_id);
        CREATE INDEX idx_requests_escrow ON access_requests(escrow_state);
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"producers".to_string()));
        assert!(tables.contains(&"items".to_string()));
        assert!(tables.contains(&"access_requests".to_string()));
        assert!(tables.contains(&"counters".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);

        // Counters are seeded once
        let counters: u32 = conn
            .query_row("SELECT COUNT(*) FROM counters", [], |row| row.get(0))
            .unwrap();
        assert_eq!(counters, 2);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, 0)",
            [CURRENT_VERSION + 1],
        )
        .unwrap();

        assert!(matches!(
            migrate(&mut conn),
            Err(StoreError::Migration(_))
        ));
    }
}
