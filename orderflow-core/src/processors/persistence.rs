use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::{ConsumerError, MessageHandler, decode};
use crate::channel::ReceivedMessage;
use crate::entities::OrderRecord;
use crate::store::{RecordStore, to_item};

/// Stores every order event as its `OrderRecord`.
///
/// The write is a full upsert keyed by order id, so redelivered and
/// duplicated events converge to the same item.
pub struct PersistenceConsumer {
    store: Option<Arc<dyn RecordStore>>,
}

impl PersistenceConsumer {
    /// `store` is `None` when no table has been configured; every batch then
    /// fails without touching its messages.
    pub fn new(store: Option<Arc<dyn RecordStore>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MessageHandler for PersistenceConsumer {
    fn name(&self) -> &str {
        "persistence"
    }

    fn ready(&self) -> Result<(), ConsumerError> {
        if self.store.is_none() {
            error!("ORDERS_TABLE_NAME is not configured; order records cannot be stored");
            return Err(ConsumerError::DependencyUnavailable(
                "record store not configured".into(),
            ));
        }
        Ok(())
    }

    async fn handle(&self, message: &ReceivedMessage) -> Result<(), ConsumerError> {
        let Some(store) = &self.store else {
            return Err(ConsumerError::DependencyUnavailable(
                "record store not configured".into(),
            ));
        };
        let event = decode(message)?;
        let record = OrderRecord::from(&event);
        store.put_item(to_item(&record)?).await?;
        info!(
            order_id = %event.order_id,
            message_id = %message.message_id,
            "Order record saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::test_support::{order_message, received};
    use crate::store::{Condition, InMemoryRecordStore, Item, StoreError};
    use serde_json::json;

    struct UnreachableStore;

    #[async_trait]
    impl RecordStore for UnreachableStore {
        async fn get_item(&self, _key: &str) -> Result<Option<Item>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn put_item(&self, _item: Item) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn put_item_if(&self, _item: Item, _condition: Condition) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_saves_order_record() {
        let store = Arc::new(InMemoryRecordStore::new());
        let consumer = PersistenceConsumer::new(Some(store.clone() as Arc<dyn RecordStore>));

        consumer.handle(&order_message("123", 100)).await.unwrap();

        let item = store.get_item("order#123").await.unwrap().unwrap();
        assert_eq!(
            serde_json::Value::Object(item),
            json!({"PK": "order#123", "order_id": "123", "amount_total": 100})
        );
    }

    #[tokio::test]
    async fn test_replay_is_idempotent() {
        let store = Arc::new(InMemoryRecordStore::new());
        let consumer = PersistenceConsumer::new(Some(store.clone() as Arc<dyn RecordStore>));
        let message = order_message("123", 100);

        consumer.handle(&message).await.unwrap();
        let first = store.get_item("order#123").await.unwrap();
        consumer.handle(&message).await.unwrap();

        assert_eq!(store.get_item("order#123").await.unwrap(), first);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unconfigured_store() {
        let consumer = PersistenceConsumer::new(None);
        assert!(matches!(
            consumer.ready(),
            Err(ConsumerError::DependencyUnavailable(_))
        ));
        assert!(matches!(
            consumer.handle(&order_message("1", 1)).await,
            Err(ConsumerError::DependencyUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_message_writes_nothing() {
        let store = Arc::new(InMemoryRecordStore::new());
        let consumer = PersistenceConsumer::new(Some(store.clone() as Arc<dyn RecordStore>));
        assert!(matches!(
            consumer.handle(&received(r#"{"Message":"nope"}"#)).await,
            Err(ConsumerError::MalformedMessage(_))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_event_without_amount_is_malformed() {
        let store = Arc::new(InMemoryRecordStore::new());
        let consumer = PersistenceConsumer::new(Some(store.clone() as Arc<dyn RecordStore>));
        assert!(matches!(
            consumer
                .handle(&received(r#"{"Message":"{\"order_id\":\"123\"}"}"#))
                .await,
            Err(ConsumerError::MalformedMessage(_))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_outage_propagates() {
        let consumer =
            PersistenceConsumer::new(Some(Arc::new(UnreachableStore) as Arc<dyn RecordStore>));
        assert!(matches!(
            consumer.handle(&order_message("1", 1)).await,
            Err(ConsumerError::DependencyUnavailable(_))
        ));
    }
}
