//! Key-value record store.
//!
//! Records are JSON objects ("items") identified by their string `PK`
//! attribute. Writes are whole-item replacements; `put_item_if` adds an
//! optimistic-concurrency condition evaluated atomically with the write.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryRecordStore;
pub use postgres::{PgRecordStore, TableName};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// Name of the key attribute every item carries.
pub const PARTITION_KEY: &str = "PK";

/// A stored record.
pub type Item = Map<String, Value>;

/// Precondition for [`RecordStore::put_item_if`].
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// No item with the same key exists.
    NotExists,
    /// The current item exists and `name` equals `value`.
    AttributeEquals { name: String, value: Value },
    /// The current item exists and has no attribute `name`.
    AttributeNotExists { name: String },
}

impl Condition {
    pub fn attribute_equals(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::AttributeEquals {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Evaluate against the currently stored item.
    pub fn holds_for(&self, current: Option<&Item>) -> bool {
        match (self, current) {
            (Condition::NotExists, current) => current.is_none(),
            (Condition::AttributeEquals { .. } | Condition::AttributeNotExists { .. }, None) => {
                false
            }
            (Condition::AttributeEquals { name, value }, Some(item)) => {
                item.get(name).is_some_and(|v| json_eq(v, value))
            }
            (Condition::AttributeNotExists { name }, Some(item)) => !item.contains_key(name),
        }
    }
}

// Numbers compare by value so that 100 and 100.0 are the same quantity.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The item has no string `PK` attribute.
    #[error("item has no string '{PARTITION_KEY}' attribute")]
    MissingKey,

    /// A conditional write found the item in an unexpected state.
    #[error("condition failed for item '{key}'")]
    ConditionFailed { key: String },

    /// A stored value could not be mapped to or from a record.
    #[error("record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stored payload is not a JSON object.
    #[error("stored item '{key}' is not a JSON object")]
    Corrupt { key: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backend refused or could not serve the request.
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Extract the `PK` of an item.
pub fn item_key(item: &Item) -> Result<&str, StoreError> {
    item.get(PARTITION_KEY)
        .and_then(Value::as_str)
        .ok_or(StoreError::MissingKey)
}

/// Convert a typed record into an item.
pub fn to_item<T: Serialize>(record: &T) -> Result<Item, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::MissingKey),
    }
}

/// Convert an item back into a typed record.
pub fn from_item<T: DeserializeOwned>(item: Item) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(item))?)
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<Item>, StoreError>;

    /// Create or fully replace the item with the same `PK`.
    async fn put_item(&self, item: Item) -> Result<(), StoreError>;

    /// Like [`put_item`](Self::put_item) but only when `condition` holds.
    ///
    /// Fails with [`StoreError::ConditionFailed`] otherwise.
    async fn put_item_if(&self, item: Item, condition: Condition) -> Result<(), StoreError>;
}
