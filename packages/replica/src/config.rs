//! Replica configuration.

use std::time::Duration;

use yoriai_server::domain::PresencePolicy;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaConfig {
    /// Shared with server mode so both derive activity the same way
    pub presence: PresencePolicy,
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            presence: PresencePolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}
