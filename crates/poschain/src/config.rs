//! Node configuration.

use std::time::Duration;

use poschain_sync::SyncConfig;

/// Default gossip topic.
pub const DEFAULT_TOPIC: &str = "PosChain";

/// Configuration for a node session.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Gossip topic every node joins.
    pub topic: String,
    /// Buffer of the accepted-block event channel.
    pub event_capacity: usize,
    /// Buffer of the handle-to-session command channel.
    pub command_capacity: usize,
    /// Sync configuration.
    pub sync: SyncConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            event_capacity: 128,
            command_capacity: 64,
            sync: SyncConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn with_command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity;
        self
    }

    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    /// Enable periodic index re-checks in steady state.
    pub fn with_resync_interval(mut self, interval: Duration) -> Self {
        self.sync.resync_interval = Some(interval);
        self
    }
}
