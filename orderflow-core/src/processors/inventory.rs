//! Inventory adjustment.
//!
//! The stock counter is a single item shared by every order, so concurrent
//! workers contend on it. Two update strategies exist:
//!
//! - [`InventoryUpdateMode::ReadModifyWrite`]: read, subtract one, write back.
//!   Two workers that read the same value both write `value - 1` and one
//!   decrement is lost.
//! - [`InventoryUpdateMode::Conditional`]: the write only succeeds if the
//!   counter still holds the value that was read; otherwise re-read and retry.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::{ConsumerError, MessageHandler, decode_reference};
use crate::channel::ReceivedMessage;
use crate::entities::inventory::STOCK_ATTRIBUTE;
use crate::entities::{INVENTORY_KEY, InventoryRecord};
use crate::store::{Condition, RecordStore, StoreError, from_item, to_item};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryUpdateMode {
    /// Unguarded read-modify-write; loses updates under concurrency.
    ReadModifyWrite,
    /// Compare-and-swap with up to `max_attempts` tries per message.
    Conditional { max_attempts: u32 },
}

impl Default for InventoryUpdateMode {
    fn default() -> Self {
        Self::Conditional {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Decrements the stock counter once per order event.
///
/// Not idempotent: a redelivered event decrements again.
pub struct InventoryConsumer {
    store: Option<Arc<dyn RecordStore>>,
    mode: InventoryUpdateMode,
}

impl InventoryConsumer {
    pub fn new(store: Option<Arc<dyn RecordStore>>, mode: InventoryUpdateMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> InventoryUpdateMode {
        self.mode
    }
}

/// Current counter plus the condition under which it may be replaced.
async fn read_inventory(
    store: &dyn RecordStore,
) -> Result<(InventoryRecord, Condition), ConsumerError> {
    let Some(item) = store.get_item(INVENTORY_KEY).await? else {
        info!("Inventory record not found, starting from default stock");
        return Ok((InventoryRecord::default(), Condition::NotExists));
    };
    let condition = match item.get(STOCK_ATTRIBUTE) {
        Some(value) => Condition::attribute_equals(STOCK_ATTRIBUTE, value.clone()),
        None => Condition::AttributeNotExists {
            name: STOCK_ATTRIBUTE.to_string(),
        },
    };
    Ok((from_item(item)?, condition))
}

#[async_trait]
impl MessageHandler for InventoryConsumer {
    fn name(&self) -> &str {
        "inventory"
    }

    fn ready(&self) -> Result<(), ConsumerError> {
        if self.store.is_none() {
            error!("ORDERS_TABLE_NAME is not configured; inventory cannot be updated");
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
        let event = decode_reference(message)?;
        debug!(order_id = %event.order_id, "Processing inventory update");

        match self.mode {
            InventoryUpdateMode::ReadModifyWrite => {
                let (current, _) = read_inventory(store.as_ref()).await?;
                let updated = current.decremented();
                store.put_item(to_item(&updated)?).await?;
                info!(
                    order_id = %event.order_id,
                    from = current.stock_quantity,
                    to = updated.stock_quantity,
                    "Inventory updated"
                );
                Ok(())
            }
            InventoryUpdateMode::Conditional { max_attempts } => {
                let max_attempts = max_attempts.max(1);
                for attempt in 1..=max_attempts {
                    let (current, condition) = read_inventory(store.as_ref()).await?;
                    let updated = current.decremented();
                    match store.put_item_if(to_item(&updated)?, condition).await {
                        Ok(()) => {
                            info!(
                                order_id = %event.order_id,
                                from = current.stock_quantity,
                                to = updated.stock_quantity,
                                attempt,
                                "Inventory updated"
                            );
                            return Ok(());
                        }
                        Err(StoreError::ConditionFailed { .. }) => {
                            debug!(
                                order_id = %event.order_id,
                                attempt,
                                "Inventory changed concurrently, retrying"
                            );
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                warn!(
                    order_id = %event.order_id,
                    max_attempts,
                    "Inventory update gave up after repeated conflicts"
                );
                Err(ConsumerError::Transient(format!(
                    "inventory update conflicted {max_attempts} times"
                )))
            }
        }
    }
}
