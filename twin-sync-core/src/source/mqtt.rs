use super::{EventSource, SourceConnectionState};
use async_trait::async_trait;
use backoff::backoff::Backoff;
use rumqttc::v5::{
    mqttbytes::{v5::Packet, QoS},
    AsyncClient, Event, MqttOptions,
};
use std::{collections::HashMap, time::Duration};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use twin_sync_error::TwinSyncResult;
use twin_sync_models::{build_exponential_backoff, settings, DeviceEvent};
use uuid::Uuid;

/// MQTT-backed event feed with a supervised connection.
///
/// Subscribes to `devices/+/events`; the device identity is the second topic
/// segment and application properties (the twin-update marker included)
/// travel as MQTT v5 user properties. The payload stays opaque — decoding it
/// is the pipeline's job, so a malformed body fails that one event rather
/// than the feed.
pub struct MqttEventSource {
    cfg: settings::Source,
    client_id: String,
    events_tx: mpsc::Sender<DeviceEvent>,
    state_tx: watch::Sender<SourceConnectionState>,
    state_rx: watch::Receiver<SourceConnectionState>,
    cancel: CancellationToken,
}

impl MqttEventSource {
    pub fn new(
        cfg: settings::Source,
        events_tx: mpsc::Sender<DeviceEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(SourceConnectionState::Disconnected);
        let client_id = cfg.client_id.clone().unwrap_or_else(|| {
            let short = Uuid::new_v4().simple().to_string();
            format!("twin-sync-{}", &short[..8])
        });
        Self {
            cfg,
            client_id,
            events_tx,
            state_tx,
            state_rx,
            cancel,
        }
    }

    /// Supervisor loop: connect, drain events until the connection drops,
    /// back off, retry per policy.
    async fn supervise(
        cfg: settings::Source,
        client_id: String,
        events_tx: mpsc::Sender<DeviceEvent>,
        state_tx: watch::Sender<SourceConnectionState>,
        cancel: CancellationToken,
    ) {
        let mut bo = build_exponential_backoff(&cfg.retry);
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                let _ = state_tx.send(SourceConnectionState::Disconnected);
                info!("event source cancelled");
                break;
            }

            if !cfg.retry.allows_attempt(attempt) {
                let _ = state_tx.send(SourceConnectionState::Failed(
                    "retry attempts exhausted".to_string(),
                ));
                warn!(
                    max_attempts = ?cfg.retry.max_attempts,
                    "event source exhausted retry attempts"
                );
                break;
            }

            attempt += 1;
            let _ = state_tx.send(SourceConnectionState::Connecting);
            info!(attempt, host = %cfg.host, port = cfg.port, "event source connecting");

            let seen_active =
                Self::run_connection(&cfg, &client_id, &events_tx, &state_tx, &cancel).await;

            if seen_active {
                bo.reset();
                attempt = 0;
            }

            if cancel.is_cancelled() {
                continue; // loop head reports and exits
            }

            match bo.next_backoff() {
                Some(delay) => {
                    let _ = state_tx.send(SourceConnectionState::Reconnecting);
                    info!(delay_ms = delay.as_millis() as u64, "event source reconnect backoff");
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => {
                    let _ = state_tx.send(SourceConnectionState::Failed(
                        "backoff time exhausted".to_string(),
                    ));
                    warn!("event source backoff exhausted");
                    break;
                }
            }
        }
    }

    /// Run one connection until it drops or is cancelled.
    ///
    /// Returns whether the connection ever became active, so the supervisor
    /// can reset its backoff.
    async fn run_connection(
        cfg: &settings::Source,
        client_id: &str,
        events_tx: &mpsc::Sender<DeviceEvent>,
        state_tx: &watch::Sender<SourceConnectionState>,
        cancel: &CancellationToken,
    ) -> bool {
        let mut options = MqttOptions::new(client_id, cfg.host.clone(), cfg.port);
        options.set_keep_alive(Duration::from_secs(cfg.keep_alive as u64));
        options.set_clean_start(cfg.clean_start);
        if let (Some(username), Some(password)) = (&cfg.username, &cfg.password) {
            options.set_credentials(username.clone(), password.clone());
        }

        let (client, mut event_loop) = AsyncClient::new(options, 100);
        let mut seen_active = false;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("event source connection cancelled, disconnecting");
                    let _ = state_tx.send(SourceConnectionState::Disconnected);
                    let _ = client.disconnect().await;
                    break;
                }
                polled = event_loop.poll() => {
                    match polled {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            info!(topic = %cfg.topic, "event source connected, subscribing");
                            seen_active = true;
                            let _ = state_tx.send(SourceConnectionState::Connected);
                            if let Err(e) = client.subscribe(cfg.topic.clone(), QoS::AtLeastOnce).await {
                                warn!(error = %e, "event source subscription failed");
                                let _ = state_tx.send(SourceConnectionState::Failed(e.to_string()));
                                break;
                            }
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            let Some(event) = decode_publish(&publish) else {
                                warn!("dropping event with unrecognized topic or metadata");
                                continue;
                            };
                            debug!(device_id = %event.device_id, "event received");
                            if events_tx.send(event).await.is_err() {
                                warn!("event channel closed, terminating source");
                                let _ = client.disconnect().await;
                                return seen_active;
                            }
                        }
                        Ok(event) => {
                            debug!("event source mqtt event: {event:?}");
                        }
                        Err(e) => {
                            warn!(error = %e, "event source connection error");
                            let _ = state_tx.send(SourceConnectionState::Failed(e.to_string()));
                            break;
                        }
                    }
                }
            }
        }

        seen_active
    }
}

#[async_trait]
impl EventSource for MqttEventSource {
    async fn start(&self) -> TwinSyncResult<()> {
        info!(host = %self.cfg.host, topic = %self.cfg.topic, "starting event source");
        tokio::spawn(Self::supervise(
            self.cfg.clone(),
            self.client_id.clone(),
            self.events_tx.clone(),
            self.state_tx.clone(),
            self.cancel.child_token(),
        ));
        Ok(())
    }

    async fn stop(&self) -> TwinSyncResult<()> {
        self.cancel.cancel();
        let _ = self.state_tx.send(SourceConnectionState::Disconnected);
        info!("event source stopped");
        Ok(())
    }

    fn subscribe_connection_state(&self) -> watch::Receiver<SourceConnectionState> {
        self.state_rx.clone()
    }
}

/// Turn one publish into a `DeviceEvent`, or `None` when the topic or
/// metadata does not fit the feed's layout.
fn decode_publish(publish: &rumqttc::v5::mqttbytes::v5::Publish) -> Option<DeviceEvent> {
    let topic = std::str::from_utf8(&publish.topic).ok()?;
    let device_id = device_id_from_topic(topic)?;
    let properties: HashMap<String, String> = publish
        .properties
        .as_ref()
        .map(|props| props.user_properties.iter().cloned().collect())
        .unwrap_or_default();
    Some(DeviceEvent::new(
        device_id,
        properties,
        publish.payload.to_vec(),
    ))
}

/// `devices/{device_id}/events` → device id.
fn device_id_from_topic(topic: &str) -> Option<&str> {
    let mut parts = topic.split('/');
    if parts.next()? != "devices" {
        return None;
    }
    let device_id = parts.next().filter(|segment| !segment.is_empty())?;
    if parts.next()? != "events" {
        return None;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(device_id)
}
