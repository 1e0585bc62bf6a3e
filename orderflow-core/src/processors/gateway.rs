//! Webhook ingestion gate.
//!
//! Order of checks: parse the body as a JSON object, resolve the API key
//! secret, authenticate, validate, publish. Only `api_key` is looked at before
//! authentication, so an unauthenticated caller always gets `Authentication`
//! whatever the other fields hold. Publishing is the last step, so a rejected
//! call leaves no state behind.

use std::sync::Arc;

use orderflow_sdk::objects::{MESSAGE_STRUCTURE_JSON, OrderEvent, PublishEnvelope};
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::bus::{BusError, EventBus, PublishRequest};
use crate::secrets::{API_KEY_SECRET, SecretError, SecretProvider};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid API key")]
    Authentication,

    #[error("missing required fields")]
    Validation,

    #[error("malformed webhook body: {0}")]
    MalformedBody(String),

    #[error("API key secret unavailable: {0}")]
    DependencyUnavailable(#[from] SecretError),

    #[error("failed to publish order event: {0}")]
    Publish(#[from] BusError),
}

/// Turns authenticated webhook calls into published order events.
pub struct WebhookGateway {
    secrets: Arc<dyn SecretProvider>,
    bus: Arc<dyn EventBus>,
    topic_arn: String,
}

impl WebhookGateway {
    pub fn new(
        secrets: Arc<dyn SecretProvider>,
        bus: Arc<dyn EventBus>,
        topic_arn: impl Into<String>,
    ) -> Self {
        Self {
            secrets,
            bus,
            topic_arn: topic_arn.into(),
        }
    }

    /// Handle one webhook body, publishing exactly one event on success.
    ///
    /// There is no deduplication: every accepted call publishes.
    pub async fn accept(&self, body: &[u8]) -> Result<OrderEvent, GatewayError> {
        let request = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(GatewayError::MalformedBody("body is not a JSON object".into())),
            Err(e) => return Err(GatewayError::MalformedBody(e.to_string())),
        };

        // Resolved per call so a rotated key applies to the next request.
        let expected = self.secrets.get_secret(API_KEY_SECRET).await?;
        if request.get("api_key").and_then(Value::as_str) != Some(expected.expose()) {
            warn!("Webhook rejected: invalid API key");
            return Err(GatewayError::Authentication);
        }

        let event = validate(&request)?;

        let message = PublishEnvelope::for_event(&event)
            .and_then(|envelope| envelope.to_message())
            .map_err(|e| BusError::InvalidParameter(e.to_string()))?;
        let receipt = self
            .bus
            .publish(PublishRequest {
                topic_arn: self.topic_arn.clone(),
                message,
                message_structure: Some(MESSAGE_STRUCTURE_JSON.to_string()),
            })
            .await?;

        info!(
            order_id = %event.order_id,
            message_id = %receipt.message_id,
            subscriptions = receipt.delivered.len(),
            "Order event published"
        );
        Ok(event)
    }
}

fn is_zero(n: &Number) -> bool {
    n.as_f64() == Some(0.0)
}

/// Empty ids and zero amounts count as missing, as do values of the wrong
/// JSON type.
fn validate(request: &Map<String, Value>) -> Result<OrderEvent, GatewayError> {
    match (request.get("order_id"), request.get("amount_total")) {
        (Some(Value::String(order_id)), Some(Value::Number(amount_total)))
            if !order_id.is_empty() && !is_zero(amount_total) =>
        {
            Ok(OrderEvent {
                order_id: order_id.clone(),
                amount_total: amount_total.clone(),
            })
        }
        _ => Err(GatewayError::Validation),
    }
}
