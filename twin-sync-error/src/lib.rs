pub mod conn;
pub mod event;
pub mod registry;
pub mod update;

use anyhow::Error as AnyhowError;
use config::ConfigError;
use conn::ConnectionStringError;
use event::EventError;
use registry::RegistryError;
use serde_json::Error as SerdeJsonError;
use std::{error::Error as StdError, io::Error as IoError};
use thiserror::Error;
use tokio::task::JoinError;
use update::UpdateError;

pub type TwinSyncResult<T, E = TwinSyncError> = anyhow::Result<T, E>;
pub type RegistryResult<T, E = RegistryError> = Result<T, E>;
pub type UpdateResult<T, E = UpdateError> = Result<T, E>;

#[derive(Error, Debug, Default)]
pub enum TwinSyncError {
    #[error("service unavailable")]
    #[default]
    ServiceUnavailable,
    #[error("operation cancelled")]
    Cancelled,
    #[error("{0}")]
    Msg(String),
    #[error("{0}")]
    IoError(#[from] IoError),
    #[error("{0}")]
    JoinError(#[from] JoinError),
    #[error("{0}")]
    Anyhow(#[from] AnyhowError),
    #[error("{0}")]
    Json(#[from] SerdeJsonError),
    #[error("{0}")]
    ConfigError(#[from] ConfigError),
    #[error("{0}")]
    StdError(#[from] Box<dyn StdError + Send + Sync>),
    #[error("{0}")]
    Event(#[from] EventError),
    #[error("{0}")]
    Registry(#[from] RegistryError),
    #[error("{0}")]
    Update(#[from] UpdateError),
    #[error("{0}")]
    ConnectionString(#[from] ConnectionStringError),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Initialization error: {0}")]
    InitializationError(String),
    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}

impl From<String> for TwinSyncError {
    #[inline]
    fn from(e: String) -> Self {
        TwinSyncError::Msg(e)
    }
}

impl From<&str> for TwinSyncError {
    #[inline]
    fn from(e: &str) -> Self {
        TwinSyncError::Msg(e.to_string())
    }
}
