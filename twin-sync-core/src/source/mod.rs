//! Inbound event feed.
//!
//! Event delivery is an external collaborator; the source's job is to hand
//! `DeviceEvent`s with their out-of-band metadata to the pipeline channel and
//! keep its connection alive.

mod mqtt;

pub use mqtt::MqttEventSource;

use async_trait::async_trait;
use tokio::sync::watch;
use twin_sync_error::TwinSyncResult;

/// Connection state of the inbound event feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed(String),
}

/// Inbound event feed.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Start delivering events in the background.
    async fn start(&self) -> TwinSyncResult<()>;

    /// Stop the feed and release its connection.
    async fn stop(&self) -> TwinSyncResult<()>;

    fn subscribe_connection_state(&self) -> watch::Receiver<SourceConnectionState>;
}
