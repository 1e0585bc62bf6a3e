//! Validated runtime configuration of the pipeline.
//!
//! These types are built by the server from its TOML file and environment;
//! the core only consumes them.

mod channels;
mod notification;

pub use channels::{AlarmSettings, ChannelSettings};
pub use notification::NotificationConfig;

use crate::processors::inventory::InventoryUpdateMode;

/// Topic identifier used when none is configured.
pub const DEFAULT_TOPIC_ARN: &str = "arn:aws:sns:local:000000000000:NewOrdersTopic";

/// Everything needed to assemble and run the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub topic_arn: String,
    pub channels: ChannelSettings,
    pub inventory_mode: InventoryUpdateMode,
    pub notification: NotificationConfig,
    pub alarms: AlarmSettings,
}
