//! Publish-subscribe fan-out from one topic to many channels.

pub mod topic;

pub use topic::Topic;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// A message to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub topic_arn: String,
    pub message: String,
    /// `Some("json")` when `message` is a per-protocol JSON map.
    pub message_structure: Option<String>,
}

/// Result of a publish that reached at least one subscription (or had none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub message_id: Uuid,
    /// Names of the channels the notification was written to.
    pub delivered: Vec<String>,
    /// Names of the channels whose write failed.
    pub failed: Vec<String>,
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("topic '{0}' does not exist")]
    TopicNotFound(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Every subscription rejected the notification.
    #[error("delivery failed for all {0} subscriptions")]
    DeliveryFailed(usize),
}

#[async_trait]
pub trait EventBus: Send + Sync {
    /// Distribute one message to every current subscription.
    async fn publish(&self, request: PublishRequest) -> Result<PublishReceipt, BusError>;
}
