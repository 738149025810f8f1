//! The reconciliation core: key sanitization, tree normalization, payload
//! cleaning, and the merge/diff engine.
//!
//! Everything here is pure and synchronous; trees are owned per event and
//! discarded after the update decision is made.

mod clean;
mod merge;
mod normalize;
mod sanitize;

pub use clean::{clean_event_payload, strip_array_fields, strip_volatile_fields};
pub use merge::{deep_equal, reconcile, Reconciliation};
pub use normalize::normalize_tree;
pub use sanitize::sanitize_property_name;
