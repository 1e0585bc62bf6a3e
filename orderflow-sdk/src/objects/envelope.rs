//! Envelopes around [`OrderEvent`] on its way from the gateway to consumers.
//!
//! The order event is JSON-encoded twice:
//!
//! ```text
//! publish:  {"default": "{\"order_id\":\"A\",\"amount_total\":5}"}   (message structure "json")
//! delivery: {"Type":"Notification","MessageId":"...","TopicArn":"...",
//!            "Message":"{\"order_id\":\"A\",\"amount_total\":5}","Timestamp":"..."}
//! ```
//!
//! Consumers must decode the delivery body and then the `Message` string.
//! [`decode_order_event`] does both and never panics; [`decode_order_reference`]
//! does the same for consumers that only need the order id.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::order::{OrderEvent, OrderReference};

/// Message structure tag telling the bus that the message is a per-protocol JSON map.
pub const MESSAGE_STRUCTURE_JSON: &str = "json";

/// Value of [`Notification::kind`] for bus deliveries.
pub const NOTIFICATION_TYPE: &str = "Notification";

/// Publish-side envelope: one message per delivery protocol.
///
/// `default` is mandatory; `sqs` overrides it for queue subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishEnvelope {
    pub default: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqs: Option<String>,
}

impl PublishEnvelope {
    /// Wrap an order event, JSON-encoding it into `default`.
    pub fn for_event(event: &OrderEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            default: serde_json::to_string(event)?,
            sqs: None,
        })
    }

    /// Serialize the envelope into the string handed to the bus.
    pub fn to_message(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Delivery-side envelope written by the bus into each subscribed channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "MessageId")]
    pub message_id: Uuid,
    #[serde(rename = "TopicArn")]
    pub topic_arn: String,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Timestamp", with = "time::serde::rfc3339")]
    pub timestamp: time::OffsetDateTime,
}

impl Notification {
    pub fn new(message_id: Uuid, topic_arn: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NOTIFICATION_TYPE.to_string(),
            message_id,
            topic_arn: topic_arn.into(),
            message: message.into(),
            timestamp: time::OffsetDateTime::now_utc(),
        }
    }
}

/// Errors from the two decode stages.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The channel body is not a notification with a string `Message`.
    #[error("invalid notification envelope: {0}")]
    Outer(#[source] serde_json::Error),

    /// The `Message` string is not an encoded order event.
    #[error("invalid order event payload: {0}")]
    Inner(#[source] serde_json::Error),
}

// Only `Message` is required to decode; the remaining notification fields are
// informational and may be absent in hand-written or replayed bodies.
#[derive(Deserialize)]
struct MessageField {
    #[serde(rename = "Message")]
    message: String,
}

fn decode_payload<T: DeserializeOwned>(body: &str) -> Result<T, EnvelopeError> {
    let outer: MessageField = serde_json::from_str(body).map_err(EnvelopeError::Outer)?;
    serde_json::from_str(&outer.message).map_err(EnvelopeError::Inner)
}

/// Decode a channel message body into the order event it carries.
///
/// Both `order_id` and `amount_total` are required.
pub fn decode_order_event(body: &str) -> Result<OrderEvent, EnvelopeError> {
    decode_payload(body)
}

/// Decode only the order id; any other payload fields are ignored.
pub fn decode_order_reference(body: &str) -> Result<OrderReference, EnvelopeError> {
    decode_payload(body)
}
