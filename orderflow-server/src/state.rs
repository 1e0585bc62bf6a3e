//! Application state shared across all request handlers.

use std::sync::Arc;

use orderflow_core::Pipeline;
use orderflow_core::processors::{AlarmBoard, WebhookGateway};

/// Application state that is shared across all request handlers.
///
/// Cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<WebhookGateway>,
    /// Channels, for operator inspection of the dead-letter queues.
    pub pipeline: Pipeline,
    /// Alarm states written by the dead-letter monitor.
    pub alarms: AlarmBoard,
}

impl AppState {
    pub fn new(gateway: WebhookGateway, pipeline: Pipeline, alarms: AlarmBoard) -> Self {
        Self {
            gateway: Arc::new(gateway),
            pipeline,
            alarms,
        }
    }
}
