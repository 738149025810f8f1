//! Twin reported-property reconciliation engine.
//!
//! Consumes per-device telemetry events and reconciles each into the
//! device's remote reported-property document: normalize both sides into the
//! store's property-bag schema, deep-merge the incoming payload over the
//! current state, and push the result only when the merge actually changed
//! the document.

pub mod client;
pub mod dispatcher;
pub mod pipeline;
pub mod reconcile;
pub mod registry;
pub mod source;

pub use client::connection_string::HubConnectionString;
pub use client::MqttReportedWriter;
pub use dispatcher::{ReportedPropertyWriter, UpdateDispatcher};
pub use pipeline::{PipelineOutcome, ReconcilePipeline};
pub use reconcile::{
    clean_event_payload, deep_equal, normalize_tree, reconcile, sanitize_property_name,
    Reconciliation,
};
pub use registry::{http::HttpTwinRegistry, RegistryCell, TwinRegistry};
pub use source::{EventSource, MqttEventSource, SourceConnectionState};
