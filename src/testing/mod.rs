//! Test doubles for the pipeline's external collaborators: an in-memory item
//! store and a table-driven identity provider stub.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tokio::sync::RwLock;

use crate::auth::{AuthError, IdentityProvider, SubjectIdentity, UserProfile};
use crate::database::models::{Item, ItemPatch};
use crate::database::{DeleteOutcome, InsertOutcome, ItemStore, StoreError, UpdateOutcome};
use crate::services::ItemService;
use crate::state::AppState;

/// In-memory `ItemStore` with the same observable semantics as the MongoDB
/// implementation: ownership-scoped filters, zero-affected outcomes on
/// non-matches, `InvalidId` on unparseable identifiers.
pub struct MemoryItemStore {
    items: RwLock<Vec<Item>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }

    pub async fn snapshot(&self) -> Vec<Item> {
        self.items.read().await.clone()
    }

    fn parse_id(id: &str) -> Result<ObjectId, StoreError> {
        ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Item>, StoreError> {
        let mut items: Vec<Item> = self
            .items
            .read()
            .await
            .iter()
            .filter(|item| item.owner == owner)
            .cloned()
            .collect();

        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn insert(&self, mut item: Item) -> Result<InsertOutcome, StoreError> {
        let oid = ObjectId::new();
        item.id = Some(oid);
        self.items.write().await.push(item);

        Ok(InsertOutcome {
            inserted_id: oid.to_hex(),
        })
    }

    async fn update_by_owner(
        &self,
        id: &str,
        owner: &str,
        patch: ItemPatch,
    ) -> Result<UpdateOutcome, StoreError> {
        let oid = Self::parse_id(id)?;

        let mut items = self.items.write().await;
        match items
            .iter_mut()
            .find(|item| item.id == Some(oid) && item.owner == owner)
        {
            Some(item) => {
                patch.apply(item);
                Ok(UpdateOutcome {
                    matched_count: 1,
                    modified_count: 1,
                })
            }
            None => Ok(UpdateOutcome {
                matched_count: 0,
                modified_count: 0,
            }),
        }
    }

    async fn delete_by_owner(&self, id: &str, owner: &str) -> Result<DeleteOutcome, StoreError> {
        let oid = Self::parse_id(id)?;

        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|item| !(item.id == Some(oid) && item.owner == owner));

        Ok(DeleteOutcome {
            deleted_count: (before - items.len()) as u64,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Identity provider stub mapping known bearer tokens to subjects; everything
/// else is rejected as an invalid credential.
pub struct StubIdentity {
    tokens: HashMap<String, String>,
}

impl StubIdentity {
    pub fn new() -> Self {
        Self {
            tokens: HashMap::new(),
        }
    }

    pub fn with_token(mut self, token: &str, subject: &str) -> Self {
        self.tokens.insert(token.to_string(), subject.to_string());
        self
    }
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn verify_token(&self, token: &str) -> Result<SubjectIdentity, AuthError> {
        self.tokens
            .get(token)
            .map(|subject| SubjectIdentity {
                subject: subject.clone(),
                email: Some(format!("{}@example.com", subject)),
            })
            .ok_or_else(|| AuthError::InvalidCredential("unknown test token".to_string()))
    }

    async fn get_user(&self, subject: &str) -> Result<UserProfile, AuthError> {
        Ok(UserProfile {
            uid: subject.to_string(),
            email: Some(format!("{}@example.com", subject)),
            display_name: None,
        })
    }
}

/// App state over the in-memory store with tokens `u1-token` and `u2-token`
/// mapped to subjects `u1` and `u2`.
pub fn test_state() -> (AppState, Arc<MemoryItemStore>) {
    let store = Arc::new(MemoryItemStore::new());
    let identity = Arc::new(
        StubIdentity::new()
            .with_token("u1-token", "u1")
            .with_token("u2-token", "u2"),
    );

    let state = AppState {
        items: Arc::new(ItemService::new(store.clone())),
        identity,
    };

    (state, store)
}
