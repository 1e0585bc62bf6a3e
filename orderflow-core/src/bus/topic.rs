use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use orderflow_sdk::objects::{MESSAGE_STRUCTURE_JSON, Notification};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::{BusError, EventBus, PublishReceipt, PublishRequest};
use crate::channel::Channel;

const SQS_PROTOCOL_KEY: &str = "sqs";
const DEFAULT_PROTOCOL_KEY: &str = "default";

/// Upper bound on one channel delivery; a slower channel counts as failed.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// In-process topic delivering notifications to subscribed channels.
pub struct Topic {
    arn: String,
    subscriptions: RwLock<Vec<Arc<dyn Channel>>>,
}

impl Topic {
    pub fn new(arn: impl Into<String>) -> Self {
        Self {
            arn: arn.into(),
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    pub fn arn(&self) -> &str {
        &self.arn
    }

    /// Register a channel; it receives every message published afterwards.
    pub async fn subscribe(&self, channel: Arc<dyn Channel>) {
        debug!(topic = %self.arn, channel = channel.name(), "Channel subscribed");
        self.subscriptions.write().await.push(channel);
    }

    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}

/// Pick the payload a queue subscription receives.
fn queue_payload(request: &PublishRequest) -> Result<String, BusError> {
    match request.message_structure.as_deref() {
        None => Ok(request.message.clone()),
        Some(MESSAGE_STRUCTURE_JSON) => {
            let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&request.message) else {
                return Err(BusError::InvalidParameter(
                    "message must be a JSON object when message structure is json".into(),
                ));
            };
            let Some(Value::String(default)) = map.get(DEFAULT_PROTOCOL_KEY) else {
                return Err(BusError::InvalidParameter(
                    "message must contain a string 'default' key".into(),
                ));
            };
            match map.get(SQS_PROTOCOL_KEY) {
                Some(Value::String(sqs)) => Ok(sqs.clone()),
                _ => Ok(default.clone()),
            }
        }
        Some(other) => Err(BusError::InvalidParameter(format!(
            "unsupported message structure '{other}'"
        ))),
    }
}

#[async_trait]
impl EventBus for Topic {
    async fn publish(&self, request: PublishRequest) -> Result<PublishReceipt, BusError> {
        if request.topic_arn != self.arn {
            return Err(BusError::TopicNotFound(request.topic_arn));
        }
        let payload = queue_payload(&request)?;

        let message_id = Uuid::now_v7();
        let notification = Notification::new(message_id, &self.arn, payload);
        let body = serde_json::to_string(&notification)
            .map_err(|e| BusError::InvalidParameter(e.to_string()))?;

        let subscriptions = self.subscriptions.read().await.clone();
        // Channels are independent: a stalled send must not hold up the rest.
        let results = join_all(subscriptions.iter().map(|channel| {
            tokio::time::timeout(DELIVERY_TIMEOUT, channel.send_message(body.clone()))
        }))
        .await;

        let mut delivered = Vec::with_capacity(subscriptions.len());
        let mut failed = Vec::new();
        for (channel, result) in subscriptions.iter().zip(results) {
            match result {
                Ok(Ok(_)) => delivered.push(channel.name().to_owned()),
                Ok(Err(e)) => {
                    error!(
                        topic = %self.arn,
                        channel = channel.name(),
                        %message_id,
                        error = %e,
                        "Failed to deliver notification"
                    );
                    failed.push(channel.name().to_owned());
                }
                Err(_) => {
                    error!(
                        topic = %self.arn,
                        channel = channel.name(),
                        %message_id,
                        timeout_secs = DELIVERY_TIMEOUT.as_secs(),
                        "Notification delivery timed out"
                    );
                    failed.push(channel.name().to_owned());
                }
            }
        }

        if subscriptions.is_empty() {
            warn!(topic = %self.arn, %message_id, "Published to a topic without subscriptions");
        } else if delivered.is_empty() {
            return Err(BusError::DeliveryFailed(failed.len()));
        }

        debug!(topic = %self.arn, %message_id, delivered = delivered.len(), "Message published");
        Ok(PublishReceipt {
            message_id,
            delivered,
            failed,
        })
    }
}
