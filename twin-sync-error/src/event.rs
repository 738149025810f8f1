use thiserror::Error;

/// Malformed-input failures.
///
/// These fail the event fast: no twin fetch is attempted past the point of
/// detection, no update is attempted, and nothing is retried from this side.
#[derive(Error, Debug)]
pub enum EventError {
    #[error("event body is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("event body must be a JSON object, got {kind}")]
    NotAnObject { kind: &'static str },

    #[error("event metadata is missing required field '{field}'")]
    MissingMetadata { field: &'static str },
}
