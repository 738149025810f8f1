pub mod http;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use twin_sync_error::{RegistryResult, TwinSyncResult};
use twin_sync_models::{DeviceCredential, TwinSnapshot};

/// Read-side collaborator: current twin documents and device credentials.
#[async_trait]
pub trait TwinRegistry: Send + Sync {
    /// Current reported state plus version token for one device.
    ///
    /// Unknown devices fail with a not-found error distinguishable from
    /// transient failures.
    async fn get_twin(&self, device_id: &str) -> RegistryResult<TwinSnapshot>;

    /// Credential material for the device's update channel. Callers must not
    /// log the result.
    async fn get_device_credential(&self, device_id: &str) -> RegistryResult<DeviceCredential>;
}

/// Process-wide registry handle with thread-safe one-time initialization.
///
/// Owned by the composition root and passed into the pipeline at startup.
/// The cell guarantees a single construction even under concurrent first
/// use; the constructed client is safe for concurrent use afterwards.
#[derive(Default)]
pub struct RegistryCell {
    cell: OnceCell<Arc<dyn TwinRegistry>>,
}

impl RegistryCell {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Return the handle, constructing it on first use.
    pub fn get_or_try_init<F>(&self, init: F) -> TwinSyncResult<Arc<dyn TwinRegistry>>
    where
        F: FnOnce() -> TwinSyncResult<Arc<dyn TwinRegistry>>,
    {
        self.cell.get_or_try_init(init).map(Arc::clone)
    }

    /// The handle, if already initialized.
    pub fn get(&self) -> Option<Arc<dyn TwinRegistry>> {
        self.cell.get().map(Arc::clone)
    }
}
