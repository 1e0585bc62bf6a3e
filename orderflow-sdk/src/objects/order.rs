use serde::{Deserialize, Serialize};
use serde_json::Number;

/// The order-created message carried through the bus and every channel.
///
/// `amount_total` keeps the JSON number exactly as the webhook caller sent it,
/// so integer cents stay integers and decimal amounts stay decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: String,
    pub amount_total: Number,
}

/// The part of an order event that only needs the order id.
///
/// Consumers that never look at the amount decode this, so a message without
/// `amount_total` is still processable for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReference {
    pub order_id: String,
}

impl From<OrderEvent> for OrderReference {
    fn from(event: OrderEvent) -> Self {
        Self {
            order_id: event.order_id,
        }
    }
}

impl OrderEvent {
    pub fn new(order_id: impl Into<String>, amount_total: impl Into<Number>) -> Self {
        Self {
            order_id: order_id.into(),
            amount_total: amount_total.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_keeps_number_kind() {
        let event: OrderEvent =
            serde_json::from_str(r#"{"order_id":"A","amount_total":12.5}"#).unwrap();
        assert!(event.amount_total.is_f64());

        let event = OrderEvent::new("B", 500u64);
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"order_id":"B","amount_total":500}"#
        );
    }
}
