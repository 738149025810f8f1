use crate::{
    dispatcher::UpdateDispatcher,
    reconcile::{clean_event_payload, normalize_tree, reconcile},
    registry::TwinRegistry,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use twin_sync_error::{event::EventError, TwinSyncError, TwinSyncResult};
use twin_sync_models::DeviceEvent;

/// Terminal state of one event's journey through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Event was not flagged for twin reconciliation
    Skipped,
    /// Merge produced no change; nothing was written
    Unchanged,
    /// Store accepted the new document
    Updated,
}

/// Per-event reconciliation pipeline.
///
/// Stages run in order with no persisted intermediate state. A failed event
/// is redone from the twin fetch on redelivery: the merge against the same
/// current state and payload yields the same decision, so redelivery is
/// safe. Overlapping executions for the same device are not excluded here;
/// the store's own per-document update semantics decide the winner.
pub struct ReconcilePipeline {
    registry: Arc<dyn TwinRegistry>,
    dispatcher: UpdateDispatcher,
}

impl ReconcilePipeline {
    pub fn new(registry: Arc<dyn TwinRegistry>, dispatcher: UpdateDispatcher) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    /// Run one event through gate → fetch → normalize → merge → dispatch.
    ///
    /// The gate runs before any registry call. Cancellation aborts in-flight
    /// I/O and fails the event without a partial update; the in-memory merge
    /// is not a cancellation point.
    pub async fn process(
        &self,
        event: &DeviceEvent,
        cancel: &CancellationToken,
    ) -> TwinSyncResult<PipelineOutcome> {
        if event.device_id.is_empty() {
            return Err(EventError::MissingMetadata {
                field: "device id",
            }
            .into());
        }

        if !event.wants_twin_update() {
            debug!(device_id = %event.device_id, "event not flagged for twin update, skipping");
            return Ok(PipelineOutcome::Skipped);
        }

        let twin = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TwinSyncError::Cancelled),
            fetched = self.registry.get_twin(&event.device_id) => {
                fetched.map_err(TwinSyncError::Registry)?
            }
        };

        let current = normalize_tree(twin.reported);
        let incoming = clean_event_payload(event.decode_payload()?);

        let outcome = reconcile(&current, &incoming);
        if !outcome.changed {
            debug!(device_id = %event.device_id, "reported properties unchanged, skipping update");
            return Ok(PipelineOutcome::Unchanged);
        }

        self.dispatcher
            .dispatch(&event.device_id, &current, &outcome.merged, cancel)
            .await?;
        Ok(PipelineOutcome::Updated)
    }
}
