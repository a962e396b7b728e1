use std::sync::Arc;

use chrono::Utc;

use crate::database::models::{Item, ItemPatch};
use crate::database::{DeleteOutcome, InsertOutcome, ItemStore, StoreError, UpdateOutcome};
use crate::validation::{CreateItemPayload, UpdateItemPayload};

/// Business-rule layer between the controllers and the repository: owner
/// assignment, default fields, timestamping. Validation happens upstream in
/// the controllers; authorization scoping happens downstream in the store
/// filters.
pub struct ItemService {
    store: Arc<dyn ItemStore>,
}

impl ItemService {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, owner: &str) -> Result<Vec<Item>, StoreError> {
        self.store.list_by_owner(owner).await
    }

    /// Build the full item from the validated draft and insert it. The owner
    /// always comes from the authenticated subject - nothing in the payload
    /// can override it.
    pub async fn create(
        &self,
        owner: &str,
        payload: CreateItemPayload,
    ) -> Result<InsertOutcome, StoreError> {
        let item = Item::new(
            owner,
            payload.name,
            payload.description,
            payload.completed,
            Utc::now(),
        );

        self.store.insert(item).await
    }

    /// Stamp `updatedAt` and apply the partial draft. `createdAt` is never
    /// restamped.
    pub async fn update(
        &self,
        id: &str,
        owner: &str,
        payload: UpdateItemPayload,
    ) -> Result<UpdateOutcome, StoreError> {
        let patch = ItemPatch {
            name: payload.name,
            description: payload.description,
            completed: payload.completed,
            updated_at: Utc::now(),
        };

        self.store.update_by_owner(id, owner, patch).await
    }

    pub async fn remove(&self, id: &str, owner: &str) -> Result<DeleteOutcome, StoreError> {
        self.store.delete_by_owner(id, owner).await
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}
