//! Dead-letter alarms.
//!
//! Each watched dead-letter channel has an alarm that is `Alarm` while at
//! least one message is visible in it (threshold 0, greater-than, one
//! evaluation period). A failed depth read counts as missing data, which is
//! treated as not breaching.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use orderflow_sdk::objects::AlarmStatus;
use tokio::sync::{RwLock, watch};
use tracing::{error, info, warn};

use crate::channel::Channel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlarmState {
    #[default]
    Ok,
    Alarm,
}

impl AlarmState {
    fn from_visible(visible: usize) -> Self {
        if visible > 0 {
            AlarmState::Alarm
        } else {
            AlarmState::Ok
        }
    }
}

impl From<AlarmState> for AlarmStatus {
    fn from(value: AlarmState) -> Self {
        match value {
            AlarmState::Ok => AlarmStatus::Ok,
            AlarmState::Alarm => AlarmStatus::Alarm,
        }
    }
}

/// Alarm states keyed by consumer name, shared with readers such as the
/// HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct AlarmBoard {
    states: Arc<RwLock<BTreeMap<String, AlarmState>>>,
}

impl AlarmBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, consumer: &str) -> AlarmState {
        self.states
            .read()
            .await
            .get(consumer)
            .copied()
            .unwrap_or_default()
    }

    pub async fn snapshot(&self) -> BTreeMap<String, AlarmState> {
        self.states.read().await.clone()
    }

    /// Store a new state; returns the previous one.
    async fn set(&self, consumer: &str, state: AlarmState) -> AlarmState {
        self.states
            .write()
            .await
            .insert(consumer.to_string(), state)
            .unwrap_or_default()
    }
}

/// A dead-letter channel under watch.
#[derive(Clone)]
pub struct WatchedDeadLetter {
    pub consumer: String,
    pub channel: Arc<dyn Channel>,
}

pub struct DeadLetterMonitor {
    watched: Vec<WatchedDeadLetter>,
    board: AlarmBoard,
    evaluation_period: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl DeadLetterMonitor {
    pub fn new(
        watched: Vec<WatchedDeadLetter>,
        board: AlarmBoard,
        evaluation_period: Duration,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            watched,
            board,
            evaluation_period,
            shutdown_rx,
        }
    }

    /// Evaluate every alarm once and record the result.
    pub async fn evaluate(&self) {
        for dlq in &self.watched {
            let visible = match dlq.channel.depth().await {
                Ok(depth) => depth.available,
                Err(e) => {
                    warn!(consumer = %dlq.consumer, error = %e, "Dead-letter depth unavailable");
                    0
                }
            };
            let state = AlarmState::from_visible(visible);
            let previous = self.board.set(&dlq.consumer, state).await;
            match (previous, state) {
                (AlarmState::Ok, AlarmState::Alarm) => error!(
                    consumer = %dlq.consumer,
                    channel = dlq.channel.name(),
                    visible,
                    "Dead-letter alarm raised: messages failed processing"
                ),
                (AlarmState::Alarm, AlarmState::Ok) => info!(
                    consumer = %dlq.consumer,
                    channel = dlq.channel.name(),
                    "Dead-letter alarm cleared"
                ),
                _ => {}
            }
        }
    }

    pub async fn run(mut self) {
        info!(watched = self.watched.len(), "DeadLetterMonitor started");
        let mut ticker = tokio::time::interval(self.evaluation_period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("DeadLetterMonitor received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    self.evaluate().await;
                }
            }
        }

        info!("DeadLetterMonitor shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelPolicy, InMemoryChannel};

    fn monitor(channel: Arc<InMemoryChannel>, board: AlarmBoard) -> DeadLetterMonitor {
        let (_tx, rx) = watch::channel(false);
        DeadLetterMonitor::new(
            vec![WatchedDeadLetter {
                consumer: "inventory".into(),
                channel,
            }],
            board,
            Duration::from_secs(60),
            rx,
        )
    }

    #[tokio::test]
    async fn test_alarm_follows_dead_letter_depth() {
        let dlq = Arc::new(InMemoryChannel::new("inventory-dlq", ChannelPolicy::default()));
        let board = AlarmBoard::new();
        let monitor = monitor(dlq.clone(), board.clone());

        monitor.evaluate().await;
        assert_eq!(board.get("inventory").await, AlarmState::Ok);

        dlq.send_message("poison".into()).await.unwrap();
        monitor.evaluate().await;
        assert_eq!(board.get("inventory").await, AlarmState::Alarm);

        let parked = dlq.receive_messages(1).await.unwrap();
        dlq.delete_message(parked[0].receipt_handle).await.unwrap();
        monitor.evaluate().await;
        assert_eq!(board.get("inventory").await, AlarmState::Ok);
    }
}
