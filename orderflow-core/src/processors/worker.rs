//! Channel polling and batch acknowledgement.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{ConsumerError, MessageHandler};
use crate::channel::{Channel, ReceivedMessage};

/// How a batch with failed messages is acknowledged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureGranularity {
    /// Stop at the first failure and acknowledge nothing; the whole batch,
    /// including messages that already succeeded, is redelivered.
    WholeBatch,
    /// Handle every message, acknowledge the successes, leave only the
    /// failures to reappear.
    #[default]
    PerMessage,
}

/// A message left unacknowledged by [`process_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemFailure {
    pub message_id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Messages deleted from the channel.
    pub acknowledged: usize,
    pub failures: Vec<BatchItemFailure>,
}

/// Run `handler` over one received batch and acknowledge according to
/// `granularity`.
///
/// Returns `Err` when the invocation as a whole failed (handler not ready, or
/// a failure under [`FailureGranularity::WholeBatch`]); in that case no
/// message of the batch was acknowledged.
pub async fn process_batch(
    channel: &dyn Channel,
    handler: &dyn MessageHandler,
    messages: Vec<ReceivedMessage>,
    granularity: FailureGranularity,
) -> Result<BatchOutcome, ConsumerError> {
    handler.ready()?;

    match granularity {
        FailureGranularity::WholeBatch => {
            for message in &messages {
                if let Err(e) = handler.handle(message).await {
                    error!(
                        consumer = handler.name(),
                        message_id = %message.message_id,
                        receive_count = message.receive_count,
                        error = %e,
                        "Failed to process message, batch will be redelivered"
                    );
                    return Err(e);
                }
            }
            let mut outcome = BatchOutcome::default();
            for message in &messages {
                if acknowledge(channel, message).await {
                    outcome.acknowledged += 1;
                }
            }
            Ok(outcome)
        }
        FailureGranularity::PerMessage => {
            let mut outcome = BatchOutcome::default();
            for message in &messages {
                match handler.handle(message).await {
                    Ok(()) => {
                        if acknowledge(channel, message).await {
                            outcome.acknowledged += 1;
                        }
                    }
                    Err(e) => {
                        error!(
                            consumer = handler.name(),
                            message_id = %message.message_id,
                            receive_count = message.receive_count,
                            error = %e,
                            "Failed to process message"
                        );
                        outcome.failures.push(BatchItemFailure {
                            message_id: message.message_id,
                            error: e.to_string(),
                        });
                    }
                }
            }
            Ok(outcome)
        }
    }
}

// A failed delete only means the message comes back; consumers tolerate that.
async fn acknowledge(channel: &dyn Channel, message: &ReceivedMessage) -> bool {
    match channel.delete_message(message.receipt_handle).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                channel = channel.name(),
                message_id = %message.message_id,
                error = %e,
                "Failed to acknowledge message"
            );
            false
        }
    }
}

/// Polling settings of a [`ChannelWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    pub batch_size: usize,
    pub poll_interval: Duration,
    pub granularity: FailureGranularity,
}

/// Long-running loop feeding one channel into one handler.
///
/// Several workers may share a channel; the visibility timeout keeps them
/// from receiving the same delivery.
pub struct ChannelWorker {
    channel: Arc<dyn Channel>,
    handler: Arc<dyn MessageHandler>,
    settings: WorkerSettings,
    shutdown_rx: watch::Receiver<bool>,
}

impl ChannelWorker {
    pub fn new(
        channel: Arc<dyn Channel>,
        handler: Arc<dyn MessageHandler>,
        settings: WorkerSettings,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            channel,
            handler,
            settings,
            shutdown_rx,
        }
    }

    /// Receive and process one batch. Returns the number of messages received.
    pub async fn poll_once(&self) -> usize {
        let messages = match self
            .channel
            .receive_messages(self.settings.batch_size)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                warn!(channel = self.channel.name(), error = %e, "Failed to receive messages");
                return 0;
            }
        };
        if messages.is_empty() {
            return 0;
        }

        let received = messages.len();
        debug!(channel = self.channel.name(), received, "Received batch");
        match process_batch(
            self.channel.as_ref(),
            self.handler.as_ref(),
            messages,
            self.settings.granularity,
        )
        .await
        {
            Ok(outcome) if !outcome.failures.is_empty() => {
                warn!(
                    consumer = self.handler.name(),
                    acknowledged = outcome.acknowledged,
                    failed = outcome.failures.len(),
                    "Batch partially processed"
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(
                    consumer = self.handler.name(),
                    received,
                    error = %e,
                    "Batch failed, nothing acknowledged"
                );
            }
        }
        received
    }

    /// Run until the shutdown signal is set or its sender is dropped.
    pub async fn run(self) {
        info!(
            consumer = self.handler.name(),
            channel = self.channel.name(),
            "ChannelWorker started"
        );
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!(consumer = self.handler.name(), "ChannelWorker received shutdown signal");
                        break;
                    }
                }

                received = self.poll_once() => {
                    if received == 0 {
                        tokio::select! {
                            biased;
                            _ = shutdown_rx.changed() => {}
                            _ = tokio::time::sleep(self.settings.poll_interval) => {}
                        }
                    }
                }
            }
        }

        info!(consumer = self.handler.name(), "ChannelWorker shutdown complete");
    }
}
