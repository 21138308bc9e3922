//! SQLite-backed location store
//!
//! One `locations` table with `AUTOINCREMENT` ids, so an id is never handed
//! out twice even after deletes. The full list is re-published on a watch
//! channel after every write.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use nimbus_core::{LocationId, LocationStore, SavedLocation, StoreError};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tokio::sync::watch;

pub struct SqliteLocationStore {
    inner: Arc<Inner>,
}

struct Inner {
    conn: Mutex<Connection>,
    tx: watch::Sender<Vec<SavedLocation>>,
}

fn db(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

impl SqliteLocationStore {
    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            );
            "#,
        )
        .map_err(db)?;

        let rows = query_all(&conn)?;
        let (tx, _) = watch::channel(rows);
        Ok(Self {
            inner: Arc::new(Inner {
                conn: Mutex::new(conn),
                tx,
            }),
        })
    }

    /// Current contents, straight from the database
    pub fn list(&self) -> Result<Vec<SavedLocation>, StoreError> {
        query_all(&self.inner.conn.lock())
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner, &Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let conn = inner.conn.lock();
            f(&inner, &conn)
        })
        .await
        .map_err(|e| StoreError::Database(format!("database task failed: {e}")))?
    }
}

fn query_all(conn: &Connection) -> Result<Vec<SavedLocation>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT id, name FROM locations ORDER BY name ASC, id ASC")
        .map_err(db)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SavedLocation {
                id: LocationId(row.get(0)?),
                name: row.get(1)?,
            })
        })
        .map_err(db)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db)?;
    Ok(rows)
}

impl Inner {
    fn publish(&self, conn: &Connection) -> Result<(), StoreError> {
        let rows = query_all(conn)?;
        self.tx.send_replace(rows);
        Ok(())
    }
}

#[async_trait]
impl LocationStore for SqliteLocationStore {
    async fn insert(&self, name: &str) -> Result<LocationId, StoreError> {
        let name = name.to_string();
        self.with_conn(move |inner, conn| {
            conn.execute("INSERT INTO locations (name) VALUES (?1)", params![name])
                .map_err(db)?;
            let id = LocationId(conn.last_insert_rowid());
            tracing::debug!(%id, %name, "inserted location");
            inner.publish(conn)?;
            Ok(id)
        })
        .await
    }

    async fn delete(&self, id: LocationId) -> Result<(), StoreError> {
        self.with_conn(move |inner, conn| {
            let removed = conn
                .execute("DELETE FROM locations WHERE id = ?1", params![id.0])
                .map_err(db)?;
            tracing::debug!(%id, removed, "deleted location");
            inner.publish(conn)
        })
        .await
    }

    fn observe_all(&self) -> watch::Receiver<Vec<SavedLocation>> {
        self.inner.tx.subscribe()
    }
}
