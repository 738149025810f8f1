use thiserror::Error;

/// Registry collaborator failures.
///
/// Not-found is fatal for the event; transient failures are re-raised to the
/// caller, which owns redelivery policy.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Device identity unknown to the registry
    #[error("device '{device_id}' is not known to the registry")]
    NotFound { device_id: String },

    /// Registry rejected our credentials
    #[error("registry authentication failed: {reason}")]
    Auth { reason: String },

    /// Network/timeout/throttling class of failure
    #[error("transient registry failure: {reason}")]
    Transient { reason: String },

    /// Response arrived but could not be interpreted
    #[error("failed to decode registry response: {reason}")]
    Decode { reason: String },

    /// Response status outside the mapped set
    #[error("unexpected registry response status {status}")]
    Unexpected { status: u16 },
}

impl RegistryError {
    /// Whether redelivering the event later could succeed.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, RegistryError::Transient { .. })
    }
}
