//! Configuration structures for the connector.

use serde::{Deserialize, Serialize};

/// The top-level configuration for the `keel-xrpl-connector` library.
///
/// Typically deserialized from a configuration file by the embedding
/// service and passed to [`AccountRegistry::new`](crate::registry::AccountRegistry::new)
/// or [`AccountTracker::new`](crate::tracker::AccountTracker::new).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConnectorConfig {
    #[serde(default)]
    pub node: Node,
    #[serde(default)]
    pub channels: ChannelConfig,
}

/// Connection settings for the ledger node, consumed by whatever
/// gateway implementation the connector is wired to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Node {
    pub ws_url: String,
}

/// Capacities for the MPSC channels inside the connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChannelConfig {
    /// The buffer capacity for the command channel to each tracker task.
    pub tracker_command_buffer: usize,
    /// The buffer capacity for individual listener channels.
    pub listener_event_buffer: usize,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            node: Node::default(),
            channels: ChannelConfig::default(),
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self {
            ws_url: "ws://127.0.0.1:6006".to_string(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            tracker_command_buffer: 128,
            listener_event_buffer: 128,
        }
    }
}
