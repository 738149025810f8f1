use crate::registry::TwinRegistry;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use twin_sync_error::{TwinSyncError, TwinSyncResult, UpdateResult};
use twin_sync_models::DeviceCredential;

/// Transport-level update call: push a full reported-property document for
/// one device, authenticated with that device's credential.
#[async_trait]
pub trait ReportedPropertyWriter: Send + Sync {
    async fn apply_reported_properties(
        &self,
        device_id: &str,
        credential: &DeviceCredential,
        properties: &Value,
        cancel: &CancellationToken,
    ) -> UpdateResult<()>;
}

/// Pushes changed documents to the store and classifies failures.
///
/// Invoked only when the merge changed the document. Never retries: the
/// trigger's redelivery policy owns retries, and an event redone from the
/// twin fetch yields the same decision.
pub struct UpdateDispatcher {
    registry: Arc<dyn TwinRegistry>,
    writer: Arc<dyn ReportedPropertyWriter>,
}

impl UpdateDispatcher {
    pub fn new(registry: Arc<dyn TwinRegistry>, writer: Arc<dyn ReportedPropertyWriter>) -> Self {
        Self { registry, writer }
    }

    /// Resolve the device credential, push `merged`, and surface the result.
    ///
    /// On success an informational record of the old→new transition is
    /// emitted; on failure the device, the attempted document, and the cause
    /// are recorded before the error propagates.
    pub async fn dispatch(
        &self,
        device_id: &str,
        previous: &Value,
        merged: &Value,
        cancel: &CancellationToken,
    ) -> TwinSyncResult<()> {
        let credential = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TwinSyncError::Cancelled),
            fetched = self.registry.get_device_credential(device_id) => {
                fetched.map_err(|e| {
                    error!(device_id, document = %merged, error = %e, "failed to resolve device credential");
                    TwinSyncError::Registry(e)
                })?
            }
        };

        match self
            .writer
            .apply_reported_properties(device_id, &credential, merged, cancel)
            .await
        {
            Ok(()) => {
                info!(device_id, from = %previous, to = %merged, "reported properties updated");
                Ok(())
            }
            Err(e) => {
                error!(device_id, document = %merged, error = %e, "failed to update reported properties");
                Err(TwinSyncError::Update(e))
            }
        }
    }
}
