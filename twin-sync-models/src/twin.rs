use serde_json::Value;
use std::fmt;

/// Current reported-property document for one device plus its version token.
///
/// The token only matters to a full-document replace, which this system does
/// not perform; it is carried for observability.
#[derive(Debug, Clone)]
pub struct TwinSnapshot {
    pub device_id: String,
    /// Reported-property tree as read from the store, service metadata
    /// already stripped
    pub reported: Value,
    /// Opaque version token (ETag)
    pub etag: Option<String>,
}

impl TwinSnapshot {
    pub fn new(device_id: impl Into<String>, reported: Value, etag: Option<String>) -> Self {
        Self {
            device_id: device_id.into(),
            reported,
            etag,
        }
    }
}

/// Symmetric key material for one device.
///
/// The raw key is only handed to the SAS signer; debug output redacts it.
#[derive(Clone)]
pub struct DeviceCredential {
    primary_key: String,
}

impl DeviceCredential {
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
        }
    }

    /// Base64-encoded symmetric key. Callers must not log the return value.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.primary_key
    }
}

impl fmt::Debug for DeviceCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCredential")
            .field("primary_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_is_redacted() {
        let credential = DeviceCredential::new("c2VjcmV0LWtleQ==");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("c2VjcmV0"));
        assert!(rendered.contains("<redacted>"));
    }
}
