use thiserror::Error;

/// Update dispatch failures, carried with the device identity so operators
/// can correlate log records with the attempted document.
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("failed to connect update client for device '{device_id}': {reason}")]
    ConnectFailed { device_id: String, reason: String },

    #[error("failed to publish reported properties for device '{device_id}': {reason}")]
    PublishFailed { device_id: String, reason: String },

    #[error("store rejected reported-property update for device '{device_id}' with status {status}")]
    Rejected { device_id: String, status: u16 },

    #[error("timed out after {timeout_ms}ms waiting for update acknowledgement for device '{device_id}'")]
    AckTimeout { device_id: String, timeout_ms: u64 },

    #[error("update for device '{device_id}' was cancelled")]
    Cancelled { device_id: String },

    #[error("credential material rejected: {reason}")]
    Credential { reason: String },

    #[error("serialization failed: {reason}")]
    Serialization { reason: String },
}

impl UpdateError {
    /// Whether redelivering the event later could succeed.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            UpdateError::ConnectFailed { .. }
                | UpdateError::PublishFailed { .. }
                | UpdateError::AckTimeout { .. }
        )
    }
}
