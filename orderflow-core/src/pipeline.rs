//! Assembly of the fan-out: one topic, three subscribed channel pairs.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::bus::Topic;
use crate::channel::{ChannelPair, ChannelPolicy};
use crate::config::{ChannelSettings, PipelineConfig};
use crate::processors::{
    AlarmBoard, ChannelWorker, DeadLetterMonitor, MessageHandler, WatchedDeadLetter,
    WorkerSettings,
};

pub const DB_UPDATE_CHANNEL: &str = "db-update";
pub const INVENTORY_CHANNEL: &str = "inventory";
pub const EMAIL_CHANNEL: &str = "email";

/// The topic and the channel pair of each consumer.
#[derive(Clone)]
pub struct Pipeline {
    pub topic: Arc<Topic>,
    pub db_update: ChannelPair,
    pub inventory: ChannelPair,
    pub email: ChannelPair,
}

/// The three consumers, one per channel.
pub struct Consumers {
    pub persistence: Arc<dyn MessageHandler>,
    pub inventory: Arc<dyn MessageHandler>,
    pub notification: Arc<dyn MessageHandler>,
}

impl Pipeline {
    /// Create the topic and channels and subscribe every queue to the topic.
    pub async fn new(topic_arn: &str, policy: ChannelPolicy) -> Self {
        let pipeline = Self {
            topic: Arc::new(Topic::new(topic_arn)),
            db_update: ChannelPair::new(DB_UPDATE_CHANNEL, policy),
            inventory: ChannelPair::new(INVENTORY_CHANNEL, policy),
            email: ChannelPair::new(EMAIL_CHANNEL, policy),
        };
        for pair in pipeline.pairs() {
            pipeline.topic.subscribe(pair.queue.clone()).await;
        }
        pipeline
    }

    pub async fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.topic_arn, config.channels.policy).await
    }

    pub fn pairs(&self) -> [&ChannelPair; 3] {
        [&self.db_update, &self.inventory, &self.email]
    }

    /// Dead-letter channels keyed by the consumer they belong to.
    pub fn dead_letters(&self) -> Vec<WatchedDeadLetter> {
        [
            ("persistence", &self.db_update),
            ("inventory", &self.inventory),
            ("notification", &self.email),
        ]
        .into_iter()
        .map(|(consumer, pair)| WatchedDeadLetter {
            consumer: consumer.to_string(),
            channel: pair.dead_letter.clone(),
        })
        .collect()
    }

    /// Spawn `workers_per_channel` workers for each consumer.
    pub fn spawn_workers(
        &self,
        consumers: &Consumers,
        settings: &ChannelSettings,
        shutdown_rx: &watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        let worker_settings = WorkerSettings {
            batch_size: settings.batch_size,
            poll_interval: settings.poll_interval,
            granularity: settings.failure_granularity,
        };
        let assignments = [
            (&self.db_update, &consumers.persistence),
            (&self.inventory, &consumers.inventory),
            (&self.email, &consumers.notification),
        ];

        let mut handles = Vec::new();
        for (pair, handler) in assignments {
            for _ in 0..settings.workers_per_channel.max(1) {
                let worker = ChannelWorker::new(
                    pair.queue.clone(),
                    handler.clone(),
                    worker_settings,
                    shutdown_rx.clone(),
                );
                handles.push(tokio::spawn(worker.run()));
            }
        }
        handles
    }

    /// Spawn the dead-letter monitor writing into `board`.
    pub fn spawn_monitor(
        &self,
        board: AlarmBoard,
        config: &PipelineConfig,
        shutdown_rx: &watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let monitor = DeadLetterMonitor::new(
            self.dead_letters(),
            board,
            config.alarms.evaluation_period,
            shutdown_rx.clone(),
        );
        tokio::spawn(monitor.run())
    }
}
