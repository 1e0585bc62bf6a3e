//! Request and response bodies of `POST /webhook`.

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Body returned with HTTP 200.
pub const MSG_ACCEPTED: &str = "Webhook received and published successfully.";
/// Body returned with HTTP 400.
pub const MSG_MISSING_FIELDS: &str = "Missing required fields.";
/// Body returned with HTTP 403.
pub const MSG_FORBIDDEN: &str = "Forbidden: Invalid API key.";
/// Body returned with HTTP 500.
pub const MSG_INTERNAL_ERROR: &str = "Internal server error while publishing event.";

/// Incoming webhook body.
///
/// Every field is optional on the wire; presence is checked by the gateway
/// after the API key has been verified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_total: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// `{"message": ...}` body used by every webhook response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
