//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for Larder. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tracing::debug;

use larder_core::{
    AccessRequest, Amount, Blake3Hash, EscrowState, Identity, Item, ItemId, Producer, RequestId,
    RequestState,
};

use crate::error::{Result, StoreError};
use crate::migration::{self, ITEM_COUNTER, REQUEST_COUNTER};
use crate::traits::{Changeset, Store, Write};

const ITEM_COLUMNS: &str = "item_id, owner, is_public, price, published_at, updated_at";

const REQUEST_COLUMNS: &str = "request_id, item_id, requester, amount, state, escrow_state, \
     escrow_recipient, created_at, resolved_at";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Column conversions
// ─────────────────────────────────────────────────────────────────────────────

fn conversion_error(idx: usize, ty: Type, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, msg.into())
}

fn column_index(row: &Row<'_>, name: &str) -> usize {
    row.as_ref().column_index(name).unwrap_or(0)
}

fn get_u64(row: &Row<'_>, name: &str) -> rusqlite::Result<u64> {
    let raw: i64 = row.get(name)?;
    u64::try_from(raw).map_err(|_| {
        conversion_error(
            column_index(row, name),
            Type::Integer,
            format!("{} is negative: {}", name, raw),
        )
    })
}

fn get_blob32(row: &Row<'_>, name: &str) -> rusqlite::Result<[u8; 32]> {
    let bytes: Vec<u8> = row.get(name)?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        conversion_error(
            column_index(row, name),
            Type::Blob,
            format!("{} must be 32 bytes, got {}", name, b.len()),
        )
    })
}

fn get_amount(row: &Row<'_>, name: &str) -> rusqlite::Result<Amount> {
    let bytes: Vec<u8> = row.get(name)?;
    let arr: [u8; 8] = bytes.try_into().map_err(|b: Vec<u8>| {
        conversion_error(
            column_index(row, name),
            Type::Blob,
            format!("{} must be 8 bytes, got {}", name, b.len()),
        )
    })?;
    Ok(Amount::from_be_bytes(arr))
}

fn to_sql_int(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{} {} exceeds SQLite integer range", what, value)))
}

fn row_to_producer(row: &Row<'_>) -> rusqlite::Result<Producer> {
    Ok(Producer {
        identity: Identity::from_bytes(get_blob32(row, "identity")?),
        item_count: get_u64(row, "item_count")?,
        reputation: row.get("reputation")?,
        profile_digest: Blake3Hash::from_bytes(get_blob32(row, "profile_digest")?),
        registered_at: row.get("registered_at")?,
    })
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: ItemId::new(get_u64(row, "item_id")?),
        owner: Identity::from_bytes(get_blob32(row, "owner")?),
        is_public: row.get("is_public")?,
        price: get_amount(row, "price")?,
        published_at: row.get("published_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_request(row: &Row<'_>) -> rusqlite::Result<AccessRequest> {
    let state_code: u8 = row.get("state")?;
    let state = RequestState::from_u8(state_code).ok_or_else(|| {
        conversion_error(
            column_index(row, "state"),
            Type::Integer,
            format!("unknown request state {}", state_code),
        )
    })?;

    let escrow_code: u8 = row.get("escrow_state")?;
    let recipient = match row.get::<_, Option<Vec<u8>>>("escrow_recipient")? {
        Some(_) => Some(Identity::from_bytes(get_blob32(row, "escrow_recipient")?)),
        None => None,
    };
    let escrow = EscrowState::from_parts(escrow_code, recipient).ok_or_else(|| {
        conversion_error(
            column_index(row, "escrow_state"),
            Type::Integer,
            format!("inconsistent escrow state {}", escrow_code),
        )
    })?;

    Ok(AccessRequest {
        id: RequestId::new(get_u64(row, "request_id")?),
        item_id: ItemId::new(get_u64(row, "item_id")?),
        requester: Identity::from_bytes(get_blob32(row, "requester")?),
        amount: get_amount(row, "amount")?,
        state,
        escrow,
        created_at: row.get("created_at")?,
        resolved_at: row.get("resolved_at")?,
    })
}

fn read_counter(conn: &Connection, name: &str) -> Result<u64> {
    let raw: i64 = conn.query_row(
        "SELECT next_value FROM counters WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    u64::try_from(raw).map_err(|_| StoreError::InvalidData(format!("counter {} is {}", name, raw)))
}

fn advance_counter(tx: &Transaction<'_>, name: &str, past: u64) -> Result<()> {
    let next = to_sql_int(past.saturating_add(1), name)?;
    tx.execute(
        "UPDATE counters SET next_value = MAX(next_value, ?2) WHERE name = ?1",
        params![name, next],
    )?;
    Ok(())
}

fn apply_write(tx: &Transaction<'_>, write: &Write) -> Result<()> {
    match write {
        Write::PutProducer(p) => {
            tx.execute(
                "INSERT OR REPLACE INTO producers (
                    identity, item_count, reputation, profile_digest, registered_at
                ) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    p.identity.as_bytes().as_slice(),
                    to_sql_int(p.item_count, "item_count")?,
                    p.reputation,
                    p.profile_digest.as_bytes().as_slice(),
                    p.registered_at,
                ],
            )?;
        }
        Write::PutItem(item) => {
            tx.execute(
                "INSERT OR REPLACE INTO items (
                    item_id, owner, is_public, price, published_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    to_sql_int(item.id.get(), "item_id")?,
                    item.owner.as_bytes().as_slice(),
                    item.is_public,
                    item.price.to_be_bytes().as_slice(),
                    item.published_at,
                    item.updated_at,
                ],
            )?;
            advance_counter(tx, ITEM_COUNTER, item.id.get())?;
        }
        Write::PutRequest(r) => {
            let recipient = r.escrow.recipient().map(|id| id.as_bytes().to_vec());
            tx.execute(
                "INSERT OR REPLACE INTO access_requests (
                    request_id, item_id, requester, amount, state, escrow_state,
                    escrow_recipient, created_at, resolved_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    to_sql_int(r.id.get(), "request_id")?,
                    to_sql_int(r.item_id.get(), "item_id")?,
                    r.requester.as_bytes().as_slice(),
                    r.amount.to_be_bytes().as_slice(),
                    r.state.to_u8(),
                    r.escrow.code(),
                    recipient,
                    r.created_at,
                    r.resolved_at,
                ],
            )?;
            advance_counter(tx, REQUEST_COUNTER, r.id.get())?;
        }
    }
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_producer(&self, identity: &Identity) -> Result<Option<Producer>> {
        let identity = *identity;
        self.run(move |conn| {
            let producer = conn
                .query_row(
                    "SELECT identity, item_count, reputation, profile_digest, registered_at
                     FROM producers WHERE identity = ?1",
                    params![identity.as_bytes().as_slice()],
                    row_to_producer,
                )
                .optional()?;
            Ok(producer)
        })
        .await
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        self.run(move |conn| {
            let item = conn
                .query_row(
                    &format!("SELECT {} FROM items WHERE item_id = ?1", ITEM_COLUMNS),
                    params![to_sql_int(id.get(), "item_id")?],
                    row_to_item,
                )
                .optional()?;
            Ok(item)
        })
        .await
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<AccessRequest>> {
        self.run(move |conn| {
            let request = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM access_requests WHERE request_id = ?1",
                        REQUEST_COLUMNS
                    ),
                    params![to_sql_int(id.get(), "request_id")?],
                    row_to_request,
                )
                .optional()?;
            Ok(request)
        })
        .await
    }

    async fn items_by_owner(&self, owner: &Identity) -> Result<Vec<Item>> {
        let owner = *owner;
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM items WHERE owner = ?1 ORDER BY item_id",
                ITEM_COLUMNS
            ))?;
            let items = stmt
                .query_map(params![owner.as_bytes().as_slice()], row_to_item)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        })
        .await
    }

    async fn requests_for_item(&self, item_id: ItemId) -> Result<Vec<AccessRequest>> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM access_requests WHERE item_id = ?1 ORDER BY request_id",
                REQUEST_COLUMNS
            ))?;
            let requests = stmt
                .query_map(params![to_sql_int(item_id.get(), "item_id")?], row_to_request)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(requests)
        })
        .await
    }

    async fn requests_by_requester(&self, requester: &Identity) -> Result<Vec<AccessRequest>> {
        let requester = *requester;
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM access_requests WHERE requester = ?1 ORDER BY request_id",
                REQUEST_COLUMNS
            ))?;
            let requests = stmt
                .query_map(params![requester.as_bytes().as_slice()], row_to_request)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(requests)
        })
        .await
    }

    async fn unsettled_requests(&self) -> Result<Vec<AccessRequest>> {
        self.run(move |conn| {
            // escrow_state 1 = releasing
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM access_requests WHERE escrow_state = 1 ORDER BY request_id",
                REQUEST_COLUMNS
            ))?;
            let requests = stmt
                .query_map([], row_to_request)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(requests)
        })
        .await
    }

    async fn has_granted(&self, requester: &Identity, item_id: ItemId) -> Result<bool> {
        let requester = *requester;
        self.run(move |conn| {
            let granted: bool = conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM access_requests
                    WHERE requester = ?1 AND item_id = ?2 AND state = ?3 AND escrow_state = 2
                )",
                params![
                    requester.as_bytes().as_slice(),
                    to_sql_int(item_id.get(), "item_id")?,
                    RequestState::Granted.to_u8(),
                ],
                |row| row.get(0),
            )?;
            Ok(granted)
        })
        .await
    }

    async fn next_item_id(&self) -> Result<ItemId> {
        self.run(|conn| Ok(ItemId::new(read_counter(conn, ITEM_COUNTER)?)))
            .await
    }

    async fn next_request_id(&self) -> Result<RequestId> {
        self.run(|conn| Ok(RequestId::new(read_counter(conn, REQUEST_COUNTER)?)))
            .await
    }

    async fn apply(&self, changes: &Changeset) -> Result<()> {
        let changes = changes.clone();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            for write in changes.writes() {
                apply_write(&tx, write)?;
            }
            tx.commit()?;
            debug!(writes = changes.len(), "committed changeset");
            Ok(())
        })
        .await
    }
}
