//! Shared mock collaborators for pipeline tests.

use async_trait::async_trait;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tokio_util::sync::CancellationToken;
use twin_sync_core::{ReconcilePipeline, ReportedPropertyWriter, TwinRegistry, UpdateDispatcher};
use twin_sync_error::{
    registry::RegistryError, update::UpdateError, RegistryResult, UpdateResult,
};
use twin_sync_models::{constants::UPDATE_TWIN_PROPERTY, DeviceCredential, DeviceEvent, TwinSnapshot};

pub enum RegistryFailure {
    NotFound,
    Transient,
}

/// In-memory registry with call counters.
pub struct MockRegistry {
    twins: Mutex<HashMap<String, Value>>,
    credential_key: String,
    fail_twin: Mutex<Option<RegistryFailure>>,
    pub twin_fetches: AtomicUsize,
    pub credential_fetches: AtomicUsize,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self {
            twins: Mutex::new(HashMap::new()),
            credential_key: "c2VjcmV0LWtleQ==".to_string(),
            fail_twin: Mutex::new(None),
            twin_fetches: AtomicUsize::new(0),
            credential_fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_twin(self, device_id: &str, reported: Value) -> Self {
        self.twins
            .lock()
            .unwrap()
            .insert(device_id.to_string(), reported);
        self
    }

    pub fn failing_with(self, failure: RegistryFailure) -> Self {
        *self.fail_twin.lock().unwrap() = Some(failure);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.twin_fetches.load(Ordering::SeqCst)
    }

    pub fn credential_count(&self) -> usize {
        self.credential_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TwinRegistry for MockRegistry {
    async fn get_twin(&self, device_id: &str) -> RegistryResult<TwinSnapshot> {
        self.twin_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.fail_twin.lock().unwrap().take() {
            return Err(match failure {
                RegistryFailure::NotFound => RegistryError::NotFound {
                    device_id: device_id.to_string(),
                },
                RegistryFailure::Transient => RegistryError::Transient {
                    reason: "registry throttled".to_string(),
                },
            });
        }
        let twins = self.twins.lock().unwrap();
        let reported = twins
            .get(device_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                device_id: device_id.to_string(),
            })?;
        Ok(TwinSnapshot::new(device_id, reported, Some("v1".to_string())))
    }

    async fn get_device_credential(&self, _device_id: &str) -> RegistryResult<DeviceCredential> {
        self.credential_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(DeviceCredential::new(self.credential_key.clone()))
    }
}

/// Update writer capturing every pushed document.
pub struct MockWriter {
    pushes: Mutex<Vec<(String, Value)>>,
    fail: bool,
}

impl MockWriter {
    pub fn new() -> Self {
        Self {
            pushes: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            pushes: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }

    pub fn pushes(&self) -> Vec<(String, Value)> {
        self.pushes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportedPropertyWriter for MockWriter {
    async fn apply_reported_properties(
        &self,
        device_id: &str,
        _credential: &DeviceCredential,
        properties: &Value,
        _cancel: &CancellationToken,
    ) -> UpdateResult<()> {
        self.pushes
            .lock()
            .unwrap()
            .push((device_id.to_string(), properties.clone()));
        if self.fail {
            return Err(UpdateError::PublishFailed {
                device_id: device_id.to_string(),
                reason: "broker unavailable".to_string(),
            });
        }
        Ok(())
    }
}

pub fn pipeline_with(registry: &Arc<MockRegistry>, writer: &Arc<MockWriter>) -> ReconcilePipeline {
    let registry_dyn = Arc::clone(registry) as Arc<dyn TwinRegistry>;
    let writer_dyn = Arc::clone(writer) as Arc<dyn ReportedPropertyWriter>;
    let dispatcher = UpdateDispatcher::new(Arc::clone(&registry_dyn), writer_dyn);
    ReconcilePipeline::new(registry_dyn, dispatcher)
}

/// Event flagged for twin reconciliation.
pub fn twin_update_event(device_id: &str, payload: &[u8]) -> DeviceEvent {
    let mut properties = HashMap::new();
    properties.insert(UPDATE_TWIN_PROPERTY.to_string(), String::new());
    DeviceEvent::new(device_id, properties, payload.to_vec())
}

/// Event without the reconciliation marker.
pub fn plain_event(device_id: &str, payload: &[u8]) -> DeviceEvent {
    DeviceEvent::new(device_id, HashMap::new(), payload.to_vec())
}
