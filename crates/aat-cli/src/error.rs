use std::io;

use aat_core::store::StoreError;
use aat_core::SyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] aat_core::Error),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Refusing to clear the cloud document for all devices. Re-run with --yes.")]
    ClearNotConfirmed,
    #[error("{0}")]
    PullFailed(String),
    #[error("Another sync is already in progress")]
    SyncBusy,
    #[error("Invalid snapshot file {path}: {message}")]
    InvalidSnapshot { path: String, message: String },
}
