//! Message channels: at-least-once backlogs with bounded redelivery.
//!
//! A message cycles between `Available` and `InFlight` until it is deleted
//! with the receipt handle of its latest delivery. Each receive increments its
//! receive count. Once a message has been received `max_receive_count` times
//! and comes up for delivery again, it is moved unchanged to the paired
//! dead-letter channel instead.
//!
//! ```text
//! Available ──receive──▶ InFlight ──delete──▶ (removed)
//!     ▲                     │
//!     └──visibility expired─┘        receive_count == max ──▶ dead-letter channel
//! ```
//!
//! There is no consumer-side retry logic: leaving a message unacknowledged
//! past its visibility timeout *is* the retry.

pub mod in_memory;

pub use in_memory::InMemoryChannel;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Default time a received message stays hidden from other receivers.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of receives before a message is dead-lettered.
pub const DEFAULT_MAX_RECEIVE_COUNT: u32 = 2;

/// Redelivery policy of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPolicy {
    pub visibility_timeout: Duration,
    pub max_receive_count: u32,
}

impl Default for ChannelPolicy {
    fn default() -> Self {
        Self {
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            max_receive_count: DEFAULT_MAX_RECEIVE_COUNT,
        }
    }
}

/// Token identifying one delivery of a message.
///
/// Every receive issues a new handle; only the latest one can acknowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(Uuid);

impl ReceiptHandle {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message as stored in a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub message_id: Uuid,
    pub body: String,
}

/// One delivery of a message to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message_id: Uuid,
    pub receipt_handle: ReceiptHandle,
    pub body: String,
    /// Number of times this message has been received, including this one.
    pub receive_count: u32,
}

/// Approximate number of messages per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelDepth {
    pub available: usize,
    pub in_flight: usize,
}

impl ChannelDepth {
    pub fn total(&self) -> usize {
        self.available + self.in_flight
    }
}

/// Errors returned by channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The receipt handle does not identify a current delivery.
    #[error("receipt handle {receipt} is not current on channel '{channel}'")]
    ReceiptNotFound {
        channel: String,
        receipt: ReceiptHandle,
    },

    /// The channel backend cannot be reached.
    #[error("channel '{channel}' unavailable: {detail}")]
    Unavailable { channel: String, detail: String },
}

/// A durable at-least-once message backlog.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name for logging and diagnostics.
    fn name(&self) -> &str;

    /// Append a message; returns the channel-assigned message id.
    async fn send_message(&self, body: String) -> Result<Uuid, ChannelError>;

    /// Receive up to `max` available messages, making them in-flight.
    async fn receive_messages(&self, max: usize) -> Result<Vec<ReceivedMessage>, ChannelError>;

    /// Acknowledge a delivery, removing the message for good.
    async fn delete_message(&self, receipt: ReceiptHandle) -> Result<(), ChannelError>;

    /// Reset the visibility timeout of a current delivery.
    ///
    /// A zero timeout makes the message available again immediately.
    async fn change_visibility(
        &self,
        receipt: ReceiptHandle,
        timeout: Duration,
    ) -> Result<(), ChannelError>;

    /// Look at up to `max` stored messages without changing their state.
    async fn peek_messages(&self, max: usize) -> Result<Vec<ChannelMessage>, ChannelError>;

    /// Approximate depth.
    async fn depth(&self) -> Result<ChannelDepth, ChannelError>;
}

/// A consumer queue together with the dead-letter channel it redrives into.
#[derive(Clone)]
pub struct ChannelPair {
    pub queue: Arc<InMemoryChannel>,
    pub dead_letter: Arc<InMemoryChannel>,
}

impl ChannelPair {
    /// Create `name` and `name-dlq` with the given policy.
    pub fn new(name: &str, policy: ChannelPolicy) -> Self {
        let dead_letter = Arc::new(InMemoryChannel::new(format!("{name}-dlq"), policy));
        let queue = Arc::new(InMemoryChannel::with_dead_letter(
            name,
            policy,
            Arc::clone(&dead_letter),
        ));
        Self { queue, dead_letter }
    }
}
