use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Condition, Item, RecordStore, StoreError, item_key};

/// Process-local [`RecordStore`].
///
/// Conditional writes check and write under one write lock, so they are
/// atomic with respect to every other operation on the store.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    items: RwLock<HashMap<String, Item>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_item(&self, key: &str) -> Result<Option<Item>, StoreError> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn put_item(&self, item: Item) -> Result<(), StoreError> {
        let key = item_key(&item)?.to_owned();
        self.items.write().await.insert(key, item);
        Ok(())
    }

    async fn put_item_if(&self, item: Item, condition: Condition) -> Result<(), StoreError> {
        let key = item_key(&item)?.to_owned();
        let mut items = self.items.write().await;
        if !condition.holds_for(items.get(&key)) {
            return Err(StoreError::ConditionFailed { key });
        }
        items.insert(key, item);
        Ok(())
    }
}
