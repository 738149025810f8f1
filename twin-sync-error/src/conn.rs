use thiserror::Error;

/// Connection-string parse failures.
///
/// Malformed connection strings are a predictable configuration-time
/// condition, so they surface as values rather than panics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStringError {
    #[error("connection string is empty")]
    Empty,

    #[error("connection string is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("connection string segment '{segment}' is not a 'Key=Value' pair")]
    MalformedSegment { segment: String },

    #[error("shared access key is not valid base64")]
    InvalidKey,
}
