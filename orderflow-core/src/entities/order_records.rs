use orderflow_sdk::objects::OrderEvent;
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Key prefix of order items.
pub const ORDER_KEY_PREFIX: &str = "order#";

/// Store key of the order with the given id.
pub fn order_key(order_id: &str) -> String {
    format!("{ORDER_KEY_PREFIX}{order_id}")
}

/// Durable copy of an accepted order.
///
/// Rewritten in full on every delivery of its event, so replays converge to
/// the same item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(rename = "PK")]
    pub pk: String,
    pub order_id: String,
    pub amount_total: Number,
}

impl From<&OrderEvent> for OrderRecord {
    fn from(event: &OrderEvent) -> Self {
        Self {
            pk: order_key(&event.order_id),
            order_id: event.order_id.clone(),
            amount_total: event.amount_total.clone(),
        }
    }
}
