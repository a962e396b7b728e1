//! Conversion from stored items to the public wire format.
//!
//! Storage and wire shapes differ in two places: the id is exposed as the
//! plain hex string rather than the driver's extended-JSON form, and the
//! timestamps render as RFC 3339 instead of BSON datetimes.

use chrono::SecondsFormat;
use serde_json::{Map, Value};

use crate::database::models::Item;

/// Convert one item into its API JSON object.
pub fn item_to_api_value(item: &Item) -> Value {
    let mut obj = Map::new();

    if let Some(id) = item.id {
        obj.insert("id".into(), Value::String(id.to_hex()));
    }
    obj.insert("name".into(), Value::String(item.name.clone()));
    if let Some(description) = &item.description {
        obj.insert("description".into(), Value::String(description.clone()));
    }
    obj.insert("owner".into(), Value::String(item.owner.clone()));
    obj.insert("completed".into(), Value::Bool(item.completed));
    obj.insert(
        "createdAt".into(),
        Value::String(item.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    obj.insert(
        "updatedAt".into(),
        Value::String(item.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    Value::Object(obj)
}

/// Convert a list of items to API values, preserving order.
pub fn items_to_api_values(items: &[Item]) -> Vec<Value> {
    items.iter().map(item_to_api_value).collect()
}
