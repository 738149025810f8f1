use clap::Parser;
use std::{env::current_dir, path::PathBuf, str::FromStr, sync::Arc};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Level};
use twin_sync_common::Logger;
use twin_sync_core::{
    EventSource, HttpTwinRegistry, HubConnectionString, MqttEventSource, MqttReportedWriter,
    ReconcilePipeline, RegistryCell, TwinRegistry, UpdateDispatcher,
};
use twin_sync_error::{TwinSyncError, TwinSyncResult};
use twin_sync_models::{constants::DEFAULT_CONFIG_FILE_NAME, DeviceEvent, Settings};

/// twin-sync - device twin reported-property reconciliation service
///
/// Consumes per-device telemetry events and reconciles each into the
/// device's remote reported-property document, writing to the store only
/// when the normalized payload actually changes it.
#[derive(Parser)]
#[command(name = "twin-sync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Twin reported-property reconciliation", long_about = None)]
struct Cli {
    /// Sets a custom config file with full path
    ///
    /// If not specified, the service looks for 'twin-sync.toml' in the
    /// current working directory.
    #[arg(short, long, env = "TWINSYNC_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> TwinSyncResult<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => {
            let dir = current_dir()
                .map_err(|e| TwinSyncError::from(format!("Failed to get current directory: {e}")))?;
            dir.join(DEFAULT_CONFIG_FILE_NAME)
        }
    };

    let settings = Settings::new(config_path.to_string_lossy().to_string())?;

    let level = Level::from_str(&settings.general.log_level)
        .map_err(|_| TwinSyncError::ConfigurationError(format!(
            "unrecognized log level '{}'",
            settings.general.log_level
        )))?;
    let mut logger = Logger::new(Some(level));
    logger.initialize()?;

    info!(config = %config_path.display(), "twin-sync starting");

    // Typed parse up front: a malformed connection string is a configuration
    // fault, reported with a reason before anything connects.
    let conn: HubConnectionString = settings.hub.connection_string.parse()?;

    let shutdown = CancellationToken::new();

    // Process-wide registry handle, initialized once and shared by every
    // pipeline execution.
    let registry_cell = RegistryCell::new();
    let registry = registry_cell.get_or_try_init(|| {
        HttpTwinRegistry::new(conn.clone(), &settings.registry)
            .map(|registry| Arc::new(registry) as Arc<dyn TwinRegistry>)
    })?;

    let writer = Arc::new(MqttReportedWriter::new(
        conn.host_name(),
        settings.update.clone(),
    ));
    let dispatcher = UpdateDispatcher::new(Arc::clone(&registry), writer);
    let pipeline = Arc::new(ReconcilePipeline::new(registry, dispatcher));

    let (events_tx, mut events_rx) = mpsc::channel::<DeviceEvent>(settings.source.queue_capacity);
    let source = MqttEventSource::new(
        settings.source.clone(),
        events_tx,
        shutdown.child_token(),
    );
    source.start().await?;

    // One pipeline execution per event, bounded; executions for different
    // devices run concurrently and do not coordinate.
    let limiter = Arc::new(Semaphore::new(settings.pipeline.max_concurrent_events));

    loop {
        tokio::select! {
            _ = shutdown_signal() => {
                info!("shutdown signal received");
                shutdown.cancel();
                break;
            }
            received = events_rx.recv() => {
                let Some(event) = received else {
                    info!("event channel closed");
                    break;
                };
                let permit = match Arc::clone(&limiter).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let pipeline = Arc::clone(&pipeline);
                let cancel = shutdown.child_token();
                tokio::spawn(async move {
                    let device_id = event.device_id.clone();
                    match pipeline.process(&event, &cancel).await {
                        Ok(outcome) => {
                            debug!(device_id, ?outcome, "event processed");
                        }
                        Err(e) => {
                            // Redelivery is the feed's concern; this side
                            // only records the failure in full.
                            error!(device_id, error = %e, "event reconciliation failed");
                        }
                    }
                    drop(permit);
                });
            }
        }
    }

    source.stop().await?;
    info!("twin-sync stopped");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
