use crate::retry::RetryPolicy;
use config::{Config, File};
use serde::Deserialize;
use std::{ops::Deref, sync::Arc};
use twin_sync_error::TwinSyncResult;

#[derive(Debug, Clone)]
pub struct Settings(Arc<Inner>);

impl Deref for Settings {
    type Target = Inner;
    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl Settings {
    pub fn new(config_path: String) -> TwinSyncResult<Self> {
        let builder = Config::builder()
            .add_source(File::with_name(config_path.as_str()).required(false))
            .add_source(
                config::Environment::with_prefix("TWINSYNC")
                    .separator("__")
                    .try_parsing(true),
            );
        let inner: Inner = builder.build()?.try_deserialize()?;
        Ok(Self(Arc::new(inner)))
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Inner {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub hub: Hub,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub registry: Registry,
    #[serde(default)]
    pub update: Update,
    #[serde(default)]
    pub pipeline: Pipeline,
}

#[derive(Debug, Clone, Deserialize)]
pub struct General {
    /// Log level for console and file sinks
    #[serde(default = "General::log_level_default")]
    pub log_level: String,
}

impl Default for General {
    fn default() -> Self {
        General {
            log_level: General::log_level_default(),
        }
    }
}

impl General {
    fn log_level_default() -> String {
        "info".into()
    }
}

/// Remote store identity and service-side credentials.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Hub {
    /// `HostName=…;SharedAccessKeyName=…;SharedAccessKey=…`
    ///
    /// Parsed into a typed value at startup; a malformed string fails fast
    /// with a reason instead of panicking later.
    #[serde(default)]
    pub connection_string: String,
}

/// Inbound event feed (MQTT).
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    #[serde(default = "Source::host_default")]
    pub host: String,
    #[serde(default = "Source::port_default")]
    pub port: u16,
    /// Subscription filter; the device identity is the second topic segment
    #[serde(default = "Source::topic_default")]
    pub topic: String,
    /// Optional client id (auto-generated if not provided)
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "Source::keep_alive_default")]
    pub keep_alive: u16,
    #[serde(default = "Source::clean_start_default")]
    pub clean_start: bool,
    /// Bounded queue capacity between source and pipeline
    #[serde(default = "Source::queue_capacity_default")]
    pub queue_capacity: usize,
    /// Reconnect policy for the connection supervisor
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for Source {
    fn default() -> Self {
        Source {
            host: Source::host_default(),
            port: Source::port_default(),
            topic: Source::topic_default(),
            client_id: None,
            username: None,
            password: None,
            keep_alive: Source::keep_alive_default(),
            clean_start: Source::clean_start_default(),
            queue_capacity: Source::queue_capacity_default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Source {
    fn host_default() -> String {
        "127.0.0.1".into()
    }

    fn port_default() -> u16 {
        1883
    }

    fn topic_default() -> String {
        "devices/+/events".into()
    }

    fn keep_alive_default() -> u16 {
        30
    }

    fn clean_start_default() -> bool {
        true
    }

    fn queue_capacity_default() -> usize {
        1024
    }
}

/// Registry REST access.
#[derive(Debug, Clone, Deserialize)]
pub struct Registry {
    /// Endpoint override, mainly for tests; defaults to `https://{HostName}`
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "Registry::request_timeout_ms_default")]
    pub request_timeout_ms: u64,
    /// Lifetime of registry-scoped SAS tokens in seconds
    #[serde(default = "Registry::sas_ttl_secs_default")]
    pub sas_ttl_secs: i64,
}

impl Default for Registry {
    fn default() -> Self {
        Registry {
            endpoint: None,
            request_timeout_ms: Registry::request_timeout_ms_default(),
            sas_ttl_secs: Registry::sas_ttl_secs_default(),
        }
    }
}

impl Registry {
    fn request_timeout_ms_default() -> u64 {
        5_000
    }

    fn sas_ttl_secs_default() -> i64 {
        3_600
    }
}

/// Per-device update channel (MQTT).
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    #[serde(default = "Update::port_default")]
    pub port: u16,
    #[serde(default = "Update::use_tls_default")]
    pub use_tls: bool,
    /// CA bundle for the TLS connection to the store
    #[serde(default)]
    pub ca_cert_path: Option<String>,
    /// How long to wait for the store's response to a patch
    #[serde(default = "Update::response_timeout_ms_default")]
    pub response_timeout_ms: u64,
    /// Lifetime of device-scoped SAS tokens in seconds
    #[serde(default = "Update::sas_ttl_secs_default")]
    pub sas_ttl_secs: i64,
    #[serde(default = "Update::keep_alive_default")]
    pub keep_alive: u16,
}

impl Default for Update {
    fn default() -> Self {
        Update {
            port: Update::port_default(),
            use_tls: Update::use_tls_default(),
            ca_cert_path: None,
            response_timeout_ms: Update::response_timeout_ms_default(),
            sas_ttl_secs: Update::sas_ttl_secs_default(),
            keep_alive: Update::keep_alive_default(),
        }
    }
}

impl Update {
    fn port_default() -> u16 {
        8883
    }

    fn use_tls_default() -> bool {
        true
    }

    fn response_timeout_ms_default() -> u64 {
        10_000
    }

    fn sas_ttl_secs_default() -> i64 {
        3_600
    }

    fn keep_alive_default() -> u16 {
        30
    }
}

/// Pipeline execution limits.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pipeline {
    /// Maximum events reconciled concurrently
    #[serde(default = "Pipeline::max_concurrent_events_default")]
    pub max_concurrent_events: usize,
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline {
            max_concurrent_events: Pipeline::max_concurrent_events_default(),
        }
    }
}

impl Pipeline {
    fn max_concurrent_events_default() -> usize {
        64
    }
}
