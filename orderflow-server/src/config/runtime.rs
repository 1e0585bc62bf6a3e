//! Runtime configuration derived from the TOML file and environment.

use std::net::SocketAddr;

use orderflow_core::config::PipelineConfig;
use orderflow_core::store::TableName;
use url::Url;

/// Validated configuration the server runs with.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub listen: SocketAddr,
    pub pipeline: PipelineConfig,
    /// Record table; `None` leaves the store-backed consumers unconfigured.
    pub orders_table: Option<TableName>,
    pub mail_relay: Option<Url>,
}
