use std::time::Duration;

use crate::channel::ChannelPolicy;
use crate::processors::worker::FailureGranularity;

/// Settings shared by the three consumer channels and their workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSettings {
    pub policy: ChannelPolicy,
    /// Maximum messages per receive.
    pub batch_size: usize,
    /// Sleep between receives that returned nothing.
    pub poll_interval: Duration,
    pub workers_per_channel: usize,
    pub failure_granularity: FailureGranularity,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            policy: ChannelPolicy::default(),
            batch_size: 10,
            poll_interval: Duration::from_millis(500),
            workers_per_channel: 1,
            failure_granularity: FailureGranularity::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmSettings {
    pub evaluation_period: Duration,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            evaluation_period: Duration::from_secs(60),
        }
    }
}
