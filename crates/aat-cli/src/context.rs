use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aat_core::config::{normalize_endpoint, ClientConfig};
use aat_core::document::DOCUMENT_KEY;
use aat_core::local::{load_snapshot, save_snapshot, FileStorage, LocalSnapshot};
use aat_core::store::{UpstashConfig, UpstashStore};
use aat_core::sync::{DirectSyncBackend, HttpSyncBackend, SyncBackend};
use aat_core::SyncClient;

use crate::cli::BackendKind;
use crate::error::CliError;

/// Everything a command needs: resolved config, local storage and a client.
pub struct CliContext {
    pub config: ClientConfig,
    pub storage: Arc<FileStorage>,
    pub client: Arc<SyncClient>,
}

impl CliContext {
    pub fn from_env(
        data_dir: Option<PathBuf>,
        endpoint: Option<String>,
        backend: BackendKind,
    ) -> Result<Self, CliError> {
        let values: HashMap<String, String> = env::vars().collect();
        let lookup = |name: &str| values.get(name).cloned();

        let mut config = ClientConfig::from_lookup(lookup)?;
        if let Some(endpoint) = endpoint {
            config.endpoint = normalize_endpoint(&endpoint)?;
        }
        config.data_dir = Some(resolve_data_dir(data_dir, config.data_dir.take()));

        let backend = build_backend(backend, &config.endpoint, lookup)?;
        Self::new(config, backend)
    }

    pub fn new(config: ClientConfig, backend: Arc<dyn SyncBackend>) -> Result<Self, CliError> {
        let data_dir = config.data_dir.clone().unwrap_or_else(default_data_dir);
        let storage = Arc::new(FileStorage::new(data_dir));
        let client = SyncClient::new(backend, storage.clone())?;
        tracing::debug!(
            device = %client.device_id(),
            data_dir = %storage.dir().display(),
            "CLI context ready"
        );

        Ok(Self {
            config,
            storage,
            client: Arc::new(client),
        })
    }

    pub fn data_dir(&self) -> &Path {
        self.storage.dir()
    }

    /// Persisted snapshot, or an empty one before the first import or pull.
    pub fn snapshot(&self) -> Result<LocalSnapshot, CliError> {
        Ok(load_snapshot(self.storage.as_ref())?.unwrap_or_default())
    }

    pub fn save_snapshot(&self, snapshot: &LocalSnapshot) -> Result<(), CliError> {
        Ok(save_snapshot(self.storage.as_ref(), snapshot)?)
    }
}

pub fn build_backend(
    kind: BackendKind,
    endpoint: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn SyncBackend>, CliError> {
    match kind {
        BackendKind::Http => Ok(Arc::new(HttpSyncBackend::new(endpoint)?)),
        BackendKind::Direct => {
            let key = lookup("AAT_SYNC_DOCUMENT_KEY")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DOCUMENT_KEY.to_string());
            let config = UpstashConfig::from_lookup(lookup)?.with_key(key);
            let store = UpstashStore::new(config)?;
            Ok(Arc::new(DirectSyncBackend::new(Arc::new(store))))
        }
    }
}

pub fn resolve_data_dir(cli_data_dir: Option<PathBuf>, configured: Option<PathBuf>) -> PathBuf {
    cli_data_dir.or(configured).unwrap_or_else(default_data_dir)
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aat")
}
