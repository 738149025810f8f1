use super::TwinRegistry;
use crate::client::{connection_string::HubConnectionString, sas::generate_sas_token};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;
use twin_sync_error::{registry::RegistryError, RegistryResult, TwinSyncError, TwinSyncResult};
use twin_sync_models::{
    constants::{API_VERSION, SERVICE_METADATA_KEYS},
    settings, DeviceCredential, TwinSnapshot,
};

/// Registry client over the store's REST surface.
///
/// One instance per process, constructed through the composition root's
/// `RegistryCell`; the underlying HTTP client pools connections and is safe
/// for concurrent use.
pub struct HttpTwinRegistry {
    http: reqwest::Client,
    endpoint: String,
    conn: HubConnectionString,
    sas_ttl_secs: i64,
}

impl HttpTwinRegistry {
    pub fn new(conn: HubConnectionString, cfg: &settings::Registry) -> TwinSyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| {
                TwinSyncError::InitializationError(format!("failed to build registry client: {e}"))
            })?;
        let endpoint = cfg
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}", conn.host_name()));
        Ok(Self {
            http,
            endpoint,
            conn,
            sas_ttl_secs: cfg.sas_ttl_secs,
        })
    }

    fn authorization(&self) -> RegistryResult<String> {
        let expiry = Utc::now().timestamp() + self.sas_ttl_secs;
        generate_sas_token(
            self.conn.host_name(),
            self.conn.key(),
            Some(self.conn.key_name()),
            expiry,
        )
        .map_err(|e| RegistryError::Auth {
            reason: e.to_string(),
        })
    }

    async fn get_json(&self, path: &str, device_id: &str) -> RegistryResult<Value> {
        let url = format!("{}{}?api-version={}", self.endpoint, path, API_VERSION);
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.authorization()?)
            .send()
            .await
            .map_err(|e| RegistryError::Transient {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, device_id));
        }
        response.json().await.map_err(|e| RegistryError::Decode {
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl TwinRegistry for HttpTwinRegistry {
    async fn get_twin(&self, device_id: &str) -> RegistryResult<TwinSnapshot> {
        let document = self.get_json(&format!("/twins/{device_id}"), device_id).await?;
        let etag = document
            .get("etag")
            .and_then(Value::as_str)
            .map(|tag| tag.trim_matches('"').to_string());
        let mut reported = document
            .pointer("/properties/reported")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        strip_service_metadata(&mut reported);
        debug!(device_id, etag = etag.as_deref().unwrap_or_default(), "fetched twin");
        Ok(TwinSnapshot::new(device_id, reported, etag))
    }

    async fn get_device_credential(&self, device_id: &str) -> RegistryResult<DeviceCredential> {
        let document = self
            .get_json(&format!("/devices/{device_id}"), device_id)
            .await?;
        let key = document
            .pointer("/authentication/symmetricKey/primaryKey")
            .and_then(Value::as_str)
            .ok_or_else(|| RegistryError::Decode {
                reason: format!("device '{device_id}' record carries no symmetric key"),
            })?;
        Ok(DeviceCredential::new(key))
    }
}

/// Remove the bookkeeping keys the store embeds in reported documents; they
/// must not take part in merge or comparison.
fn strip_service_metadata(reported: &mut Value) {
    if let Value::Object(entries) = reported {
        for key in SERVICE_METADATA_KEYS {
            entries.remove(key);
        }
    }
}

fn classify_status(status: StatusCode, device_id: &str) -> RegistryError {
    match status {
        StatusCode::NOT_FOUND => RegistryError::NotFound {
            device_id: device_id.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RegistryError::Auth {
            reason: format!("registry returned {status}"),
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => RegistryError::Transient {
            reason: format!("registry returned {status}"),
        },
        status if status.is_server_error() => RegistryError::Transient {
            reason: format!("registry returned {status}"),
        },
        status => RegistryError::Unexpected {
            status: status.as_u16(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_mapping_is_distinguishable() {
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "dev-1"),
            RegistryError::NotFound { device_id } if device_id == "dev-1"
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "dev-1"),
            RegistryError::Auth { .. }
        ));
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "dev-1").is_transient());
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "dev-1").is_transient());
        assert!(matches!(
            classify_status(StatusCode::IM_A_TEAPOT, "dev-1"),
            RegistryError::Unexpected { status: 418 }
        ));
    }

    #[test]
    fn service_metadata_is_stripped() {
        let mut reported = json!({
            "$metadata": {"temp": {"$lastUpdated": "2026-08-07T10:00:00Z"}},
            "$version": 7,
            "temp": 21
        });
        strip_service_metadata(&mut reported);
        assert_eq!(reported, json!({"temp": 21}));
    }
}
