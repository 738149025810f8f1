use super::{
    sas::{device_resource_uri, generate_sas_token},
    topics::{parse_twin_response, Topics},
};
use chrono::Utc;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, TlsConfiguration, Transport};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use twin_sync_error::{update::UpdateError, UpdateResult};
use twin_sync_models::{constants::API_VERSION, settings, DeviceCredential};
use uuid::Uuid;

/// Build a short, broker-safe client id.
fn normalize_client_id(input: &str) -> String {
    const MAX_LEN: usize = 23;
    let filtered: String = input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if filtered.len() > MAX_LEN {
        filtered[..MAX_LEN].to_string()
    } else {
        filtered
    }
}

/// Publish `patch` as the device's new reported properties and wait for the
/// store's response.
///
/// One complete cycle per call: connect authenticated as the device,
/// subscribe to the response topic, publish the patch at QoS 1, wait for the
/// correlated status with a deadline, disconnect. The caller owns retries.
pub(crate) async fn push_reported_patch(
    cfg: &settings::Update,
    host: &str,
    device_id: &str,
    credential: &DeviceCredential,
    patch: &Value,
    cancel: &CancellationToken,
) -> UpdateResult<()> {
    let expiry = Utc::now().timestamp() + cfg.sas_ttl_secs;
    let sas = generate_sas_token(
        &device_resource_uri(host, device_id),
        credential.expose(),
        None,
        expiry,
    )?;

    let mut options = MqttOptions::new(normalize_client_id(device_id), host, cfg.port);
    options.set_credentials(format!("{host}/{device_id}/?api-version={API_VERSION}"), sas);
    options.set_keep_alive(Duration::from_secs(cfg.keep_alive as u64));
    options.set_clean_session(true);
    if cfg.use_tls {
        let ca = match &cfg.ca_cert_path {
            Some(path) => std::fs::read(path).map_err(|e| UpdateError::ConnectFailed {
                device_id: device_id.to_string(),
                reason: format!("failed to read CA bundle '{path}': {e}"),
            })?,
            None => Vec::new(),
        };
        options.set_transport(Transport::Tls(TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth: None,
        }));
    }

    let (client, mut event_loop) = AsyncClient::new(options, 10);

    client
        .subscribe(Topics::twin_response_filter(), QoS::AtLeastOnce)
        .await
        .map_err(|e| UpdateError::ConnectFailed {
            device_id: device_id.to_string(),
            reason: format!("failed to subscribe to twin responses: {e}"),
        })?;

    let request_id = Uuid::new_v4().simple().to_string();
    let payload = serde_json::to_vec(patch).map_err(|e| UpdateError::Serialization {
        reason: e.to_string(),
    })?;
    client
        .publish(
            Topics::reported_patch(&request_id),
            QoS::AtLeastOnce,
            false,
            payload,
        )
        .await
        .map_err(|e| UpdateError::PublishFailed {
            device_id: device_id.to_string(),
            reason: e.to_string(),
        })?;

    debug!(
        device_id,
        request_id, "reported-property patch published, awaiting response"
    );

    // Poll the event loop in a background task so the wait below can race
    // cancellation and the deadline.
    let (poll_tx, mut poll_rx) = mpsc::channel::<Result<Event, rumqttc::ConnectionError>>(10);
    tokio::spawn(async move {
        loop {
            match event_loop.poll().await {
                Ok(event) => {
                    if poll_tx.send(Ok(event)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = poll_tx.send(Err(e)).await;
                    break;
                }
            }
        }
    });

    let deadline = tokio::time::Instant::now() + Duration::from_millis(cfg.response_timeout_ms);
    let result = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break Err(UpdateError::Cancelled {
                    device_id: device_id.to_string(),
                });
            }
            _ = tokio::time::sleep_until(deadline) => {
                break Err(UpdateError::AckTimeout {
                    device_id: device_id.to_string(),
                    timeout_ms: cfg.response_timeout_ms,
                });
            }
            polled = poll_rx.recv() => match polled {
                Some(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                    let Some(response) = parse_twin_response(&publish.topic) else {
                        continue;
                    };
                    if response.request_id.as_deref() != Some(request_id.as_str()) {
                        continue;
                    }
                    debug!(device_id, status = response.status, "twin patch response received");
                    if (200..300).contains(&response.status) {
                        break Ok(());
                    }
                    break Err(UpdateError::Rejected {
                        device_id: device_id.to_string(),
                        status: response.status,
                    });
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => break Err(UpdateError::PublishFailed {
                    device_id: device_id.to_string(),
                    reason: e.to_string(),
                }),
                None => break Err(UpdateError::PublishFailed {
                    device_id: device_id.to_string(),
                    reason: "event loop terminated before a response arrived".to_string(),
                }),
            }
        }
    };

    let _ = client.disconnect().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ids_are_filtered_and_bounded() {
        assert_eq!(normalize_client_id("dev-1"), "dev-1");
        assert_eq!(normalize_client_id("dev 1/worker"), "dev-1-worker");
        assert_eq!(
            normalize_client_id("a-very-long-device-identity-string").len(),
            23
        );
    }
}
