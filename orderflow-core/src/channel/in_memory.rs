//! In-process channel honouring the visibility-timeout / dead-letter contract.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    Channel, ChannelDepth, ChannelError, ChannelMessage, ChannelPolicy, ReceiptHandle,
    ReceivedMessage,
};

#[derive(Debug)]
enum EntryState {
    Available,
    InFlight {
        receipt: ReceiptHandle,
        visible_at: Instant,
    },
}

#[derive(Debug)]
struct Entry {
    message_id: Uuid,
    body: String,
    receive_count: u32,
    state: EntryState,
}

impl Entry {
    fn is_visible(&self, now: Instant) -> bool {
        match self.state {
            EntryState::Available => true,
            EntryState::InFlight { visible_at, .. } => visible_at <= now,
        }
    }

    fn holds(&self, receipt: ReceiptHandle) -> bool {
        matches!(self.state, EntryState::InFlight { receipt: r, .. } if r == receipt)
    }
}

/// In-memory [`Channel`].
///
/// Messages are kept in arrival order and delivered oldest-first, but
/// redeliveries interleave with new arrivals, so consumers must not rely on
/// ordering.
pub struct InMemoryChannel {
    name: String,
    policy: ChannelPolicy,
    entries: Mutex<VecDeque<Entry>>,
    dead_letter: Option<Arc<InMemoryChannel>>,
}

impl InMemoryChannel {
    /// A channel without a dead-letter pair; it redelivers indefinitely.
    pub fn new(name: impl Into<String>, policy: ChannelPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            entries: Mutex::new(VecDeque::new()),
            dead_letter: None,
        }
    }

    /// A channel that moves exhausted messages into `dead_letter`.
    pub fn with_dead_letter(
        name: impl Into<String>,
        policy: ChannelPolicy,
        dead_letter: Arc<InMemoryChannel>,
    ) -> Self {
        Self {
            dead_letter: Some(dead_letter),
            ..Self::new(name, policy)
        }
    }

    pub fn policy(&self) -> ChannelPolicy {
        self.policy
    }

    async fn push_dead_letter(&self, message_id: Uuid, body: String) {
        self.entries.lock().await.push_back(Entry {
            message_id,
            body,
            receive_count: 0,
            state: EntryState::Available,
        });
    }
}

#[async_trait]
impl Channel for InMemoryChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_message(&self, body: String) -> Result<Uuid, ChannelError> {
        let message_id = Uuid::now_v7();
        self.entries.lock().await.push_back(Entry {
            message_id,
            body,
            receive_count: 0,
            state: EntryState::Available,
        });
        debug!(channel = %self.name, %message_id, "Message enqueued");
        Ok(message_id)
    }

    async fn receive_messages(&self, max: usize) -> Result<Vec<ReceivedMessage>, ChannelError> {
        let now = Instant::now();
        let mut received = Vec::new();
        let mut exhausted = Vec::new();

        {
            let mut entries = self.entries.lock().await;
            let mut i = 0;
            while i < entries.len() && received.len() < max {
                if !entries[i].is_visible(now) {
                    i += 1;
                    continue;
                }

                if self.dead_letter.is_some()
                    && entries[i].receive_count >= self.policy.max_receive_count
                {
                    if let Some(entry) = entries.remove(i) {
                        exhausted.push(entry);
                    }
                    continue;
                }

                let entry = &mut entries[i];
                let receipt = ReceiptHandle::generate();
                entry.receive_count += 1;
                entry.state = EntryState::InFlight {
                    receipt,
                    visible_at: now + self.policy.visibility_timeout,
                };
                received.push(ReceivedMessage {
                    message_id: entry.message_id,
                    receipt_handle: receipt,
                    body: entry.body.clone(),
                    receive_count: entry.receive_count,
                });
                i += 1;
            }
        }

        if let Some(dead_letter) = &self.dead_letter {
            for entry in exhausted {
                warn!(
                    channel = %self.name,
                    dead_letter = %dead_letter.name,
                    message_id = %entry.message_id,
                    receive_count = entry.receive_count,
                    "Max receive count exceeded, moving message to dead-letter channel"
                );
                dead_letter
                    .push_dead_letter(entry.message_id, entry.body)
                    .await;
            }
        }

        Ok(received)
    }

    async fn delete_message(&self, receipt: ReceiptHandle) -> Result<(), ChannelError> {
        let mut entries = self.entries.lock().await;
        let Some(index) = entries.iter().position(|e| e.holds(receipt)) else {
            return Err(ChannelError::ReceiptNotFound {
                channel: self.name.clone(),
                receipt,
            });
        };
        if let Some(entry) = entries.remove(index) {
            debug!(channel = %self.name, message_id = %entry.message_id, "Message acknowledged");
        }
        Ok(())
    }

    async fn change_visibility(
        &self,
        receipt: ReceiptHandle,
        timeout: Duration,
    ) -> Result<(), ChannelError> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.iter_mut().find(|e| e.holds(receipt)) else {
            return Err(ChannelError::ReceiptNotFound {
                channel: self.name.clone(),
                receipt,
            });
        };
        entry.state = EntryState::InFlight {
            receipt,
            visible_at: Instant::now() + timeout,
        };
        Ok(())
    }

    async fn peek_messages(&self, max: usize) -> Result<Vec<ChannelMessage>, ChannelError> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .take(max)
            .map(|e| ChannelMessage {
                message_id: e.message_id,
                body: e.body.clone(),
            })
            .collect())
    }

    async fn depth(&self) -> Result<ChannelDepth, ChannelError> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        let available = entries.iter().filter(|e| e.is_visible(now)).count();
        Ok(ChannelDepth {
            available,
            in_flight: entries.len() - available,
        })
    }
}
