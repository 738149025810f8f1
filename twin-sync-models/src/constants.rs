/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "twin-sync.toml";

/// Application property that marks an event for twin reconciliation.
/// Events without this property are ignored before any registry call.
pub const UPDATE_TWIN_PROPERTY: &str = "UpdateTwin";

/// Top-level payload field excluded from reconciliation.
/// It changes on every event and would defeat no-op detection.
pub const VOLATILE_TIMESTAMP_FIELD: &str = "timeStamp";

/// Service metadata keys the store embeds in reported-property documents.
/// Stripped on read so they never take part in merge or comparison.
pub const SERVICE_METADATA_KEYS: [&str; 2] = ["$metadata", "$version"];

/// REST api-version pinned for registry and device-channel calls.
pub const API_VERSION: &str = "2021-04-12";
