use thiserror::Error;

pub mod connection;
pub mod models;
pub mod repository;

pub use connection::{ConnectionCache, DbHandle};
pub use repository::{DeleteOutcome, InsertOutcome, ItemStore, MongoItemStore, UpdateOutcome};

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The connection cache could not establish a store connection. The
    /// cache slot stays empty so the next request retries.
    #[error("database unavailable: {0}")]
    ConnectionUnavailable(String),

    /// The supplied identifier can never name a stored document.
    #[error("invalid item id: {0}")]
    InvalidId(String),

    /// A store operation failed after the connection succeeded.
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
}
