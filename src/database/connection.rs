//! Lazily-established, process-wide document store connection.
//!
//! Opening a MongoDB client costs a network round-trip, so the handle is
//! created on first use and reused by every request for the lifetime of the
//! process. The empty-to-populated transition is guarded so concurrent first
//! requests share a single connect attempt instead of racing.

use std::future::Future;

use bson::doc;
use mongodb::{Client, Database};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::StoreError;

/// Live client/database pair held by the cache. Cheap to clone - both halves
/// are handles over a shared connection pool.
#[derive(Clone)]
pub struct DbHandle {
    pub client: Client,
    pub database: Database,
}

/// Async lazy slot with a single-flight populate guard. A failed
/// initialization leaves the slot empty so a later call can retry.
pub struct SingleFlightCell<T> {
    slot: RwLock<Option<T>>,
    init_lock: Mutex<()>,
}

impl<T: Clone> SingleFlightCell<T> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
            init_lock: Mutex::new(()),
        }
    }

    /// Return the cached value, or run `init` to populate the slot. Callers
    /// that arrive while an attempt is in flight await that same attempt.
    pub async fn get_or_try_init<F, Fut, E>(&self, init: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.slot.read().await.as_ref() {
            return Ok(value.clone());
        }

        let _guard = self.init_lock.lock().await;

        // The attempt that held the lock before us may have populated the slot
        if let Some(value) = self.slot.read().await.as_ref() {
            return Ok(value.clone());
        }

        let value = init().await?;
        *self.slot.write().await = Some(value.clone());
        Ok(value)
    }

    /// Empty the slot, returning whatever it held.
    pub async fn take(&self) -> Option<T> {
        let _guard = self.init_lock.lock().await;
        self.slot.write().await.take()
    }
}

impl<T: Clone> Default for SingleFlightCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide connection cache for the document store. Constructed once in
/// `main` and injected into the repository.
pub struct ConnectionCache {
    config: DatabaseConfig,
    cell: SingleFlightCell<DbHandle>,
}

impl ConnectionCache {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            cell: SingleFlightCell::new(),
        }
    }

    /// Get the cached handle, connecting on first use. No I/O on the warm path.
    pub async fn handle(&self) -> Result<DbHandle, StoreError> {
        self.cell.get_or_try_init(|| Self::connect(&self.config)).await
    }

    async fn connect(config: &DatabaseConfig) -> Result<DbHandle, StoreError> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .map_err(|e| StoreError::ConnectionUnavailable(e.to_string()))?;

        let database = match &config.database {
            Some(name) => client.database(name),
            None => client.default_database().ok_or_else(|| {
                StoreError::ConnectionUnavailable(
                    "connection string names no database and MONGODB_DB is unset".to_string(),
                )
            })?,
        };

        // The driver connects lazily; ping now so a bad target surfaces here
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::ConnectionUnavailable(e.to_string()))?;

        info!(database = %database.name(), "opened document store connection");

        Ok(DbHandle { client, database })
    }

    /// Tear down the active connection and reset the slot. Graceful shutdown
    /// only - requests never call this.
    pub async fn close(&self) {
        if let Some(handle) = self.cell.take().await {
            let name = handle.database.name().to_string();
            handle.client.shutdown().await;
            info!(database = %name, "closed document store connection");
        }
    }
}
