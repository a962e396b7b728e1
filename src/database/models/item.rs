use bson::oid::ObjectId;
use bson::{doc, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single achievement item, as persisted in the `items` collection.
///
/// `owner` is copied from the authenticated subject at creation and is the
/// sole authorization predicate for every later read or write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner: String,
    pub completed: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Construct a new item for `owner`. Default application happens here and
    /// nowhere else: `completed` falls back to false and both timestamps are
    /// stamped to the same instant. The store assigns the id at insert.
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
        completed: Option<bool>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            description,
            owner: owner.into(),
            completed: completed.unwrap_or(false),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial field replacement for an update. Only fields that are present are
/// written; `updated_at` is always restamped, `created_at` never.
#[derive(Debug, Clone)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl ItemPatch {
    /// Render as the `$set` document for an update-by-filter operation.
    pub fn into_set_document(self) -> Document {
        let mut set = doc! { "updatedAt": bson::DateTime::from_chrono(self.updated_at) };

        if let Some(name) = self.name {
            set.insert("name", name);
        }
        if let Some(description) = self.description {
            set.insert("description", description);
        }
        if let Some(completed) = self.completed {
            set.insert("completed", completed);
        }

        set
    }

    /// Apply the patch to an in-memory item. Mirrors the `$set` semantics of
    /// [`ItemPatch::into_set_document`].
    pub fn apply(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(description) = &self.description {
            item.description = Some(description.clone());
        }
        if let Some(completed) = self.completed {
            item.completed = completed;
        }
        item.updated_at = self.updated_at;
    }
}
