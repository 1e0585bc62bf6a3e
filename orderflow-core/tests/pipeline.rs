use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orderflow_core::Pipeline;
use orderflow_core::channel::{Channel, ChannelPolicy};
use orderflow_core::config::NotificationConfig;
use orderflow_core::entities::{INVENTORY_KEY, order_key};
use orderflow_core::mailer::{EmailMessage, MailError, Mailer};
use orderflow_core::processors::{
    AlarmBoard, AlarmState, ChannelWorker, DeadLetterMonitor, FailureGranularity,
    InventoryConsumer, InventoryUpdateMode, MessageHandler, NotificationConsumer,
    PersistenceConsumer, WebhookGateway, WorkerSettings,
};
use orderflow_core::secrets::StaticSecretProvider;
use orderflow_core::store::{Condition, InMemoryRecordStore, Item, RecordStore, StoreError};
use serde_json::json;
use tokio::sync::{Mutex, watch};

const ARN: &str = "arn:aws:sns:us-east-1:000000000000:NewOrdersTopic";
const VISIBILITY: Duration = Duration::from_secs(60);

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email(&self, message: &EmailMessage) -> Result<String, MailError> {
        self.sent.lock().await.push(message.clone());
        Ok("mail-id".into())
    }
}

struct DownStore;

#[async_trait]
impl RecordStore for DownStore {
    async fn get_item(&self, _key: &str) -> Result<Option<Item>, StoreError> {
        Err(StoreError::Unavailable("throttled".into()))
    }
    async fn put_item(&self, _item: Item) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("throttled".into()))
    }
    async fn put_item_if(&self, _item: Item, _condition: Condition) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("throttled".into()))
    }
}

struct Harness {
    pipeline: Pipeline,
    gateway: WebhookGateway,
    store: Arc<InMemoryRecordStore>,
    mailer: Arc<RecordingMailer>,
    shutdown_tx: watch::Sender<bool>,
}

impl Harness {
    async fn new() -> Self {
        let pipeline = Pipeline::new(ARN, ChannelPolicy::default()).await;
        let secrets = Arc::new(StaticSecretProvider::new().with_secret("API_KEY", "secret"));
        let gateway = WebhookGateway::new(secrets, pipeline.topic.clone(), ARN);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            pipeline,
            gateway,
            store: Arc::new(InMemoryRecordStore::new()),
            mailer: Arc::new(RecordingMailer::default()),
            shutdown_tx,
        }
    }

    fn worker(
        &self,
        channel: Arc<dyn Channel>,
        handler: Arc<dyn MessageHandler>,
        granularity: FailureGranularity,
    ) -> ChannelWorker {
        ChannelWorker::new(
            channel,
            handler,
            WorkerSettings {
                batch_size: 10,
                poll_interval: Duration::from_millis(100),
                granularity,
            },
            self.shutdown_tx.subscribe(),
        )
    }

    fn persistence(&self) -> ChannelWorker {
        let store: Arc<dyn RecordStore> = self.store.clone();
        self.worker(
            self.pipeline.db_update.queue.clone(),
            Arc::new(PersistenceConsumer::new(Some(store))),
            FailureGranularity::PerMessage,
        )
    }

    fn inventory(&self, store: Arc<dyn RecordStore>) -> ChannelWorker {
        self.worker(
            self.pipeline.inventory.queue.clone(),
            Arc::new(InventoryConsumer::new(
                Some(store),
                InventoryUpdateMode::default(),
            )),
            FailureGranularity::PerMessage,
        )
    }

    fn notification(&self, granularity: FailureGranularity) -> ChannelWorker {
        self.worker(
            self.pipeline.email.queue.clone(),
            Arc::new(NotificationConsumer::new(
                self.mailer.clone(),
                NotificationConfig {
                    sender: "orders@example.com".into(),
                    recipient: "customer@example.com".into(),
                },
            )),
            granularity,
        )
    }

    async fn webhook(&self, order_id: &str, amount: u64) {
        let body = json!({"order_id": order_id, "amount_total": amount, "api_key": "secret"});
        self.gateway
            .accept(body.to_string().as_bytes())
            .await
            .unwrap();
    }

    async fn stock(&self) -> i64 {
        let item = self.store.get_item(INVENTORY_KEY).await.unwrap().unwrap();
        item["stock_quantity"].as_i64().unwrap()
    }
}

#[tokio::test(start_paused = true)]
async fn test_order_flows_to_every_consumer() {
    let h = Harness::new().await;
    h.webhook("ORD-1", 500).await;

    for pair in h.pipeline.pairs() {
        assert_eq!(pair.queue.depth().await.unwrap().available, 1);
    }

    assert_eq!(h.persistence().poll_once().await, 1);
    assert_eq!(h.inventory(h.store.clone()).poll_once().await, 1);
    assert_eq!(
        h.notification(FailureGranularity::PerMessage)
            .poll_once()
            .await,
        1
    );

    let record = h.store.get_item(&order_key("ORD-1")).await.unwrap().unwrap();
    assert_eq!(
        serde_json::Value::Object(record),
        json!({"PK": "order#ORD-1", "order_id": "ORD-1", "amount_total": 500})
    );
    assert_eq!(h.stock().await, 99);
    let sent = h.mailer.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Order Confirmation - ORD-1");

    for pair in h.pipeline.pairs() {
        assert_eq!(pair.queue.depth().await.unwrap().total(), 0);
        assert_eq!(pair.dead_letter.depth().await.unwrap().total(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_failing_consumer_does_not_affect_others() {
    let h = Harness::new().await;
    h.webhook("ORD-2", 10).await;

    h.persistence().poll_once().await;
    h.notification(FailureGranularity::PerMessage)
        .poll_once()
        .await;
    let broken_inventory = h.inventory(Arc::new(DownStore));
    broken_inventory.poll_once().await;

    assert!(h.store.get_item(&order_key("ORD-2")).await.unwrap().is_some());
    assert_eq!(h.mailer.sent.lock().await.len(), 1);
    assert_eq!(
        h.pipeline.inventory.queue.depth().await.unwrap().in_flight,
        1
    );

    // Store outage outlasts both deliveries: the event is dead-lettered.
    tokio::time::advance(VISIBILITY + Duration::from_secs(1)).await;
    assert_eq!(broken_inventory.poll_once().await, 1);
    tokio::time::advance(VISIBILITY + Duration::from_secs(1)).await;
    assert_eq!(broken_inventory.poll_once().await, 0);

    let parked = h.pipeline.inventory.dead_letter.peek_messages(10).await.unwrap();
    assert_eq!(parked.len(), 1);
    let event = orderflow_sdk::objects::decode_order_event(&parked[0].body).unwrap();
    assert_eq!(event.order_id, "ORD-2");
}

#[tokio::test(start_paused = true)]
async fn test_recovered_store_processes_redelivery() {
    let h = Harness::new().await;
    h.webhook("ORD-3", 10).await;

    h.inventory(Arc::new(DownStore)).poll_once().await;
    tokio::time::advance(VISIBILITY + Duration::from_secs(1)).await;
    assert_eq!(h.inventory(h.store.clone()).poll_once().await, 1);

    assert_eq!(h.stock().await, 99);
    assert_eq!(
        h.pipeline.inventory.dead_letter.depth().await.unwrap().total(),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn test_malformed_message_raises_alarm() {
    let h = Harness::new().await;
    h.pipeline
        .db_update
        .queue
        .send_message("{\"Message\": 42}".into())
        .await
        .unwrap();
    let worker = h.persistence();
    let board = AlarmBoard::new();
    let monitor = DeadLetterMonitor::new(
        h.pipeline.dead_letters(),
        board.clone(),
        Duration::from_secs(60),
        h.shutdown_tx.subscribe(),
    );

    worker.poll_once().await;
    tokio::time::advance(VISIBILITY + Duration::from_secs(1)).await;
    worker.poll_once().await;
    tokio::time::advance(VISIBILITY + Duration::from_secs(1)).await;
    worker.poll_once().await;

    monitor.evaluate().await;
    assert_eq!(board.get("persistence").await, AlarmState::Alarm);
    assert_eq!(board.get("inventory").await, AlarmState::Ok);
    assert_eq!(board.get("notification").await, AlarmState::Ok);

    // Operator drains the dead-letter channel.
    let dlq = &h.pipeline.db_update.dead_letter;
    for message in dlq.receive_messages(10).await.unwrap() {
        dlq.delete_message(message.receipt_handle).await.unwrap();
    }
    monitor.evaluate().await;
    assert_eq!(board.get("persistence").await, AlarmState::Ok);
}

#[tokio::test(start_paused = true)]
async fn test_whole_batch_failure_redelivers_successes() {
    let h = Harness::new().await;
    h.webhook("A", 1).await;
    h.pipeline
        .email
        .queue
        .send_message("garbage".into())
        .await
        .unwrap();
    h.webhook("B", 1).await;

    let worker = h.notification(FailureGranularity::WholeBatch);
    worker.poll_once().await;
    // "A" was mailed before the batch failed on "garbage".
    assert_eq!(h.mailer.sent.lock().await.len(), 1);
    assert_eq!(h.pipeline.email.queue.depth().await.unwrap().in_flight, 3);

    tokio::time::advance(VISIBILITY + Duration::from_secs(1)).await;
    worker.poll_once().await;
    // Redelivery mails "A" again.
    assert_eq!(h.mailer.sent.lock().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_per_message_failure_keeps_only_the_failure() {
    let h = Harness::new().await;
    h.webhook("A", 1).await;
    h.pipeline
        .email
        .queue
        .send_message("garbage".into())
        .await
        .unwrap();
    h.webhook("B", 1).await;

    let worker = h.notification(FailureGranularity::PerMessage);
    worker.poll_once().await;
    assert_eq!(h.mailer.sent.lock().await.len(), 2);

    tokio::time::advance(VISIBILITY + Duration::from_secs(1)).await;
    assert_eq!(worker.poll_once().await, 1);
    assert_eq!(h.mailer.sent.lock().await.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_inventory_workers_lose_nothing() {
    let h = Harness::new().await;
    for i in 0..30 {
        h.webhook(&format!("ORD-{i}"), 1).await;
    }

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..3 {
        let worker = h.inventory(h.store.clone());
        tasks.spawn(worker.run());
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while h.pipeline.inventory.queue.depth().await.unwrap().total() > 0 {
        assert!(tokio::time::Instant::now() < deadline, "inventory not drained");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    h.shutdown_tx.send(true).unwrap();
    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    assert_eq!(h.stock().await, 70);
}
