//! Pipeline stages.
//!
//! - `WebhookGateway`: authenticates a webhook call and publishes one `OrderEvent`
//! - `PersistenceConsumer`: upserts the `OrderRecord`
//! - `InventoryConsumer`: decrements the shared stock counter
//! - `NotificationConsumer`: sends the confirmation email
//! - `ChannelWorker`: drives a consumer from its channel
//! - `DeadLetterMonitor`: raises an alarm while a dead-letter channel is non-empty
//!
//! Consumers never swallow their own errors: a failed message stays
//! unacknowledged and the channel redelivers it.

pub mod dead_letter_monitor;
pub mod gateway;
pub mod inventory;
pub mod notification;
pub mod persistence;
pub mod worker;

pub use dead_letter_monitor::{AlarmBoard, AlarmState, DeadLetterMonitor, WatchedDeadLetter};
pub use gateway::{GatewayError, WebhookGateway};
pub use inventory::{InventoryConsumer, InventoryUpdateMode};
pub use notification::NotificationConsumer;
pub use persistence::PersistenceConsumer;
pub use worker::{
    BatchItemFailure, BatchOutcome, ChannelWorker, FailureGranularity, WorkerSettings,
    process_batch,
};

use async_trait::async_trait;
use orderflow_sdk::objects::{
    EnvelopeError, OrderEvent, OrderReference, decode_order_event, decode_order_reference,
};
use thiserror::Error;

use crate::channel::ReceivedMessage;
use crate::mailer::MailError;
use crate::store::StoreError;

/// Why a consumer could not process a message.
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// Either decode stage failed. Redelivery cannot help; the message
    /// ends up in the dead-letter channel.
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] EnvelopeError),

    /// A collaborator is unconfigured or unreachable.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Anything else; a later delivery may succeed.
    #[error("transient failure: {0}")]
    Transient(String),
}

impl From<StoreError> for ConsumerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(_) | StoreError::Unavailable(_) => {
                ConsumerError::DependencyUnavailable(e.to_string())
            }
            _ => ConsumerError::Transient(e.to_string()),
        }
    }
}

impl From<MailError> for ConsumerError {
    fn from(e: MailError) -> Self {
        match e {
            MailError::Transport(_) => ConsumerError::DependencyUnavailable(e.to_string()),
            _ => ConsumerError::Transient(e.to_string()),
        }
    }
}

/// Per-message processing logic of one consumer.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Consumer name for logs.
    fn name(&self) -> &str;

    /// Checked once per batch, before any message is handled.
    fn ready(&self) -> Result<(), ConsumerError> {
        Ok(())
    }

    async fn handle(&self, message: &ReceivedMessage) -> Result<(), ConsumerError>;
}

/// Decode a received message into its order event.
pub(crate) fn decode(message: &ReceivedMessage) -> Result<OrderEvent, ConsumerError> {
    Ok(decode_order_event(&message.body)?)
}

/// Decode only the order id of a received message.
pub(crate) fn decode_reference(
    message: &ReceivedMessage,
) -> Result<OrderReference, ConsumerError> {
    Ok(decode_order_reference(&message.body)?)
}
