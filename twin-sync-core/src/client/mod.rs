//! Transport-level access to the store: connection-string parsing, SAS
//! credentials, and the one-shot per-device update client.

pub mod connection_string;
mod mqtt;
pub mod sas;
pub mod topics;

use crate::dispatcher::ReportedPropertyWriter;
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use twin_sync_error::UpdateResult;
use twin_sync_models::{settings, DeviceCredential};

/// Production update writer.
///
/// Builds a fresh per-device MQTT client for every call and pushes the
/// merged document as a reported-property patch. A fresh client per update
/// keeps credentials device-scoped and avoids holding per-device
/// connections open between events.
pub struct MqttReportedWriter {
    host: String,
    cfg: settings::Update,
}

impl MqttReportedWriter {
    pub fn new(host: impl Into<String>, cfg: settings::Update) -> Self {
        Self {
            host: host.into(),
            cfg,
        }
    }
}

#[async_trait]
impl ReportedPropertyWriter for MqttReportedWriter {
    async fn apply_reported_properties(
        &self,
        device_id: &str,
        credential: &DeviceCredential,
        properties: &Value,
        cancel: &CancellationToken,
    ) -> UpdateResult<()> {
        mqtt::push_reported_patch(&self.cfg, &self.host, device_id, credential, properties, cancel)
            .await
    }
}
