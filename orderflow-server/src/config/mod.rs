//! Configuration module for orderflow-server.
//!
//! Handles loading configuration from the TOML file, CLI arguments and
//! environment variables, then validates it into a [`RuntimeConfig`].

pub mod file;
pub mod runtime;

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use orderflow_core::channel::ChannelPolicy;
use orderflow_core::config::{AlarmSettings, ChannelSettings, NotificationConfig, PipelineConfig};
use orderflow_core::processors::InventoryUpdateMode;
use orderflow_core::store::TableName;
use thiserror::Error;

use crate::config::file::{FileConfig, InventoryMode};
use crate::config::runtime::RuntimeConfig;

pub const ENV_SENDER_EMAIL: &str = "SENDER_EMAIL";
pub const ENV_RECIPIENT_EMAIL: &str = "RECIPIENT_EMAIL";
pub const ENV_TOPIC_ARN: &str = "SNS_TOPIC_ARN";
pub const ENV_ORDERS_TABLE: &str = "ORDERS_TABLE_NAME";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load the configuration using the process environment.
    pub fn load(&self) -> Result<RuntimeConfig, ConfigError> {
        self.load_with_env(|name| std::env::var(name).ok())
    }

    /// Load the configuration, resolving overrides through `env`.
    ///
    /// 1. Read the TOML file (a missing file means defaults)
    /// 2. Apply environment and CLI overrides
    /// 3. Validate and build the runtime configuration
    pub fn load_with_env(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<RuntimeConfig, ConfigError> {
        let mut file_config = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.config_path.display(),
                    "Config file not found, using defaults"
                );
                FileConfig::default()
            }
            Err(e) => return Err(e.into()),
        };

        apply_env_overrides(&mut file_config, env);
        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        build_runtime_config(file_config)
    }
}

fn apply_env_overrides(config: &mut FileConfig, env: impl Fn(&str) -> Option<String>) {
    let lookup = |name: &str| env(name).filter(|value| !value.is_empty());

    if let Some(sender) = lookup(ENV_SENDER_EMAIL) {
        config.notification.sender = Some(sender);
    }
    if let Some(recipient) = lookup(ENV_RECIPIENT_EMAIL) {
        config.notification.recipient = Some(recipient);
    }
    if let Some(arn) = lookup(ENV_TOPIC_ARN) {
        config.server.topic_arn = arn;
    }
    if let Some(table) = lookup(ENV_ORDERS_TABLE) {
        config.server.orders_table = Some(table);
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

fn build_runtime_config(config: FileConfig) -> Result<RuntimeConfig, ConfigError> {
    let channels = &config.channels;
    if channels.batch_size == 0 {
        return Err(invalid("channels.batch_size must be at least 1"));
    }
    if channels.max_receive_count == 0 {
        return Err(invalid("channels.max_receive_count must be at least 1"));
    }
    if channels.visibility_timeout_secs == 0 {
        return Err(invalid("channels.visibility_timeout_secs must be positive"));
    }
    if channels.workers_per_channel == 0 {
        return Err(invalid("channels.workers_per_channel must be at least 1"));
    }
    if config.alarms.evaluation_period_secs == 0 {
        return Err(invalid("alarms.evaluation_period_secs must be positive"));
    }
    if config.server.topic_arn.is_empty() {
        return Err(invalid("server.topic_arn must not be empty"));
    }

    let inventory_mode = match config.inventory.mode {
        InventoryMode::ReadModifyWrite => InventoryUpdateMode::ReadModifyWrite,
        InventoryMode::Conditional if config.inventory.max_attempts == 0 => {
            return Err(invalid("inventory.max_attempts must be at least 1"));
        }
        InventoryMode::Conditional => InventoryUpdateMode::Conditional {
            max_attempts: config.inventory.max_attempts,
        },
    };

    let orders_table = match config.server.orders_table.as_deref() {
        Some(name) => Some(TableName::parse(name).ok_or_else(|| {
            invalid(format!(
                "orders table name {name:?} must be 1-63 bytes without quotes or control characters"
            ))
        })?),
        None => None,
    };

    let sender = config
        .notification
        .sender
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid(format!("notification sender missing (set {ENV_SENDER_EMAIL})")))?;
    let recipient = config
        .notification
        .recipient
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            invalid(format!(
                "notification recipient missing (set {ENV_RECIPIENT_EMAIL})"
            ))
        })?;

    Ok(RuntimeConfig {
        listen: config.server.listen,
        pipeline: PipelineConfig {
            topic_arn: config.server.topic_arn,
            channels: ChannelSettings {
                policy: ChannelPolicy {
                    visibility_timeout: Duration::from_secs(channels.visibility_timeout_secs),
                    max_receive_count: channels.max_receive_count,
                },
                batch_size: channels.batch_size,
                poll_interval: Duration::from_millis(channels.poll_interval_ms),
                workers_per_channel: channels.workers_per_channel,
                failure_granularity: channels.failure_granularity,
            },
            inventory_mode,
            notification: NotificationConfig { sender, recipient },
            alarms: AlarmSettings {
                evaluation_period: Duration::from_secs(config.alarms.evaluation_period_secs),
            },
        },
        orders_table,
        mail_relay: config.mail.relay_url,
    })
}

/// Get the database URL from environment variable.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
