use std::sync::{Arc, Mutex};
use tracing::{subscriber::set_global_default, Level};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    filter::DynFilterFn, fmt, layer::SubscriberExt, Layer, Registry,
};
use twin_sync_error::{TwinSyncError, TwinSyncResult};

/// Process-wide logging bootstrap.
///
/// Installs a console layer and a daily-rolling file layer. The worker guard
/// for the non-blocking file writer is held here; dropping the `Logger`
/// flushes and stops the writer.
pub struct Logger {
    level: Arc<Mutex<Level>>,
    _file_guard: Option<WorkerGuard>,
}

impl Logger {
    pub fn new(level: Option<Level>) -> Self {
        Logger {
            level: Arc::new(Mutex::new(level.unwrap_or(Level::INFO))),
            _file_guard: None,
        }
    }

    /// Sets a new logging level for both sinks.
    #[inline]
    pub fn set_level(&self, new_level: Level) {
        let mut level = self.level.lock().unwrap();
        *level = new_level;
    }

    /// Current log level.
    ///
    /// # Panics
    /// Panics if the level lock is poisoned.
    #[inline]
    pub fn get_level(&self) -> Level {
        *self.level.lock().unwrap()
    }

    /// Install the global subscriber with console and file output.
    pub fn initialize(&mut self) -> TwinSyncResult<()> {
        let file_appender = rolling::daily("logs", "twin-sync.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        self._file_guard = Some(guard);

        let console_filter = {
            let level = Arc::clone(&self.level);
            DynFilterFn::new(move |metadata, _| metadata.level() <= &*level.lock().unwrap())
        };

        let file_filter = {
            let level = Arc::clone(&self.level);
            DynFilterFn::new(move |metadata, _| metadata.level() <= &*level.lock().unwrap())
        };

        let console_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_filter(console_filter);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_filter(file_filter);

        let subscriber = Registry::default().with(console_layer).with(file_layer);

        set_global_default(subscriber)
            .map_err(|_| TwinSyncError::from("Failed to set logger"))?;
        Ok(())
    }
}
