use std::sync::Arc;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::stream::TryStreamExt;
use mongodb::Collection;
use serde::Serialize;

use crate::database::connection::ConnectionCache;
use crate::database::models::{Item, ItemPatch};
use crate::database::StoreError;

const ITEMS_COLLECTION: &str = "items";

/// Outcome of an insert: the store-assigned identifier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOutcome {
    pub inserted_id: String,
}

/// Outcome of an ownership-scoped update. Zero matched means the id does not
/// exist or belongs to someone else - indistinguishable on purpose.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Outcome of an ownership-scoped delete.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub deleted_count: u64,
}

/// Persistence operations for the `items` collection. Production wires
/// [`MongoItemStore`]; tests substitute an in-memory implementation.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// All items for `owner`, newest first by creation time. Unbounded - the
    /// resource has no pagination contract.
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Item>, StoreError>;

    async fn insert(&self, item: Item) -> Result<InsertOutcome, StoreError>;

    /// Update matching `id` AND `owner`; only supplied fields are written.
    /// A non-match is a zero-count outcome, not an error.
    async fn update_by_owner(
        &self,
        id: &str,
        owner: &str,
        patch: ItemPatch,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Delete matching `id` AND `owner`; a non-match is a zero-count outcome.
    async fn delete_by_owner(&self, id: &str, owner: &str) -> Result<DeleteOutcome, StoreError>;

    /// Liveness probe against the underlying store.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// MongoDB-backed item store. Every operation obtains its handle from the
/// shared connection cache.
pub struct MongoItemStore {
    connections: Arc<ConnectionCache>,
}

impl MongoItemStore {
    pub fn new(connections: Arc<ConnectionCache>) -> Self {
        Self { connections }
    }

    async fn collection(&self) -> Result<Collection<Item>, StoreError> {
        let handle = self.connections.handle().await?;
        Ok(handle.database.collection::<Item>(ITEMS_COLLECTION))
    }

    fn parse_id(id: &str) -> Result<ObjectId, StoreError> {
        ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
    }
}

#[async_trait]
impl ItemStore for MongoItemStore {
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Item>, StoreError> {
        let cursor = self
            .collection()
            .await?
            .find(doc! { "owner": owner })
            .sort(doc! { "createdAt": -1 })
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn insert(&self, item: Item) -> Result<InsertOutcome, StoreError> {
        let result = self.collection().await?.insert_one(&item).await?;

        let inserted_id = result
            .inserted_id
            .as_object_id()
            .map(|oid| oid.to_hex())
            .unwrap_or_else(|| result.inserted_id.to_string());

        Ok(InsertOutcome { inserted_id })
    }

    async fn update_by_owner(
        &self,
        id: &str,
        owner: &str,
        patch: ItemPatch,
    ) -> Result<UpdateOutcome, StoreError> {
        let oid = Self::parse_id(id)?;

        let result = self
            .collection()
            .await?
            .update_one(
                doc! { "_id": oid, "owner": owner },
                doc! { "$set": patch.into_set_document() },
            )
            .await?;

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    async fn delete_by_owner(&self, id: &str, owner: &str) -> Result<DeleteOutcome, StoreError> {
        let oid = Self::parse_id(id)?;

        let result = self
            .collection()
            .await?
            .delete_one(doc! { "_id": oid, "owner": owner })
            .await?;

        Ok(DeleteOutcome {
            deleted_count: result.deleted_count,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let handle = self.connections.handle().await?;
        handle
            .database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(StoreError::Driver)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_ids_before_touching_the_store() {
        let err = MongoItemStore::parse_id("not-an-object-id").unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(_)));

        let hex = ObjectId::new().to_hex();
        assert!(MongoItemStore::parse_id(&hex).is_ok());
    }
}
