//! TOML file configuration structures.
//!
//! These structs map directly to the `orderflow.toml` file format. Every
//! field has a default, so an empty or missing file is valid input.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use url::Url;

use orderflow_core::config::DEFAULT_TOPIC_ARN;
use orderflow_core::processors::FailureGranularity;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub channels: ChannelsConfig,
    pub inventory: InventoryConfig,
    pub notification: NotificationConfig,
    pub mail: MailConfig,
    pub alarms: AlarmsConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    pub listen: SocketAddr,
    /// Identifier of the order events topic. Overridden by `SNS_TOPIC_ARN`.
    pub topic_arn: String,
    /// Record table name. Overridden by `ORDERS_TABLE_NAME`.
    pub orders_table: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
            topic_arn: DEFAULT_TOPIC_ARN.to_string(),
            orders_table: None,
        }
    }
}

/// Consumer channel section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub visibility_timeout_secs: u64,
    pub max_receive_count: u32,
    pub batch_size: usize,
    pub poll_interval_ms: u64,
    pub workers_per_channel: usize,
    pub failure_granularity: FailureGranularity,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_secs: 60,
            max_receive_count: 2,
            batch_size: 10,
            poll_interval_ms: 500,
            workers_per_channel: 1,
            failure_granularity: FailureGranularity::PerMessage,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryMode {
    ReadModifyWrite,
    #[default]
    Conditional,
}

/// Inventory consumer section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub mode: InventoryMode,
    /// Attempts per message in conditional mode.
    pub max_attempts: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            mode: InventoryMode::Conditional,
            max_attempts: 10,
        }
    }
}

/// Email addresses. Overridden by `SENDER_EMAIL` / `RECIPIENT_EMAIL`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub sender: Option<String>,
    pub recipient: Option<String>,
}

/// Mail transport section. Without a relay URL emails are only logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub relay_url: Option<Url>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmsConfig {
    pub evaluation_period_secs: u64,
}

impl Default for AlarmsConfig {
    fn default() -> Self {
        Self {
            evaluation_period_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"
topic_arn = "arn:aws:sns:eu-west-1:123456789012:Orders"
orders_table = "orders"

[channels]
visibility_timeout_secs = 30
max_receive_count = 5
batch_size = 4
poll_interval_ms = 250
workers_per_channel = 3
failure_granularity = "whole_batch"

[inventory]
mode = "read_modify_write"
max_attempts = 3

[notification]
sender = "shop@example.com"
recipient = "ops@example.com"

[mail]
relay_url = "http://localhost:9000/send"

[alarms]
evaluation_period_secs = 15
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.server.orders_table.as_deref(), Some("orders"));
        assert_eq!(config.channels.max_receive_count, 5);
        assert_eq!(config.channels.workers_per_channel, 3);
        assert_eq!(
            config.channels.failure_granularity,
            FailureGranularity::WholeBatch
        );
        assert_eq!(config.inventory.mode, InventoryMode::ReadModifyWrite);
        assert_eq!(config.notification.sender.as_deref(), Some("shop@example.com"));
        assert_eq!(
            config.mail.relay_url.unwrap().as_str(),
            "http://localhost:9000/send"
        );
        assert_eq!(config.alarms.evaluation_period_secs, 15);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen.port(), 8080);
        assert_eq!(config.server.topic_arn, DEFAULT_TOPIC_ARN);
        assert_eq!(config.channels.visibility_timeout_secs, 60);
        assert_eq!(config.channels.max_receive_count, 2);
        assert_eq!(
            config.channels.failure_granularity,
            FailureGranularity::PerMessage
        );
        assert_eq!(config.inventory.mode, InventoryMode::Conditional);
        assert_eq!(config.inventory.max_attempts, 10);
        assert!(config.mail.relay_url.is_none());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: FileConfig = toml::from_str("[channels]\nbatch_size = 1\n").unwrap();
        assert_eq!(config.channels.batch_size, 1);
        assert_eq!(config.channels.max_receive_count, 2);
    }
}
