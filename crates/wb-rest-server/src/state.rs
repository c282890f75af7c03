//! Server state management

use crate::config::{ServerConfig, StorageConfig};
use crate::error::ServerResult;
use crate::executor::RunLocks;
use crate::models::{DataStore, DatabaseStore, JsonFileStore, SharedStore};
use std::sync::Arc;
use wb_local_db::Database;
use wb_runner_client::{RunnerClient, RunnerConfig};

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    /// Storage backend
    pub store: SharedStore,

    /// Server configuration
    pub config: ServerConfig,

    /// Per-task-id run serialization (process-local)
    pub run_locks: Arc<RunLocks>,
}

impl AppState {
    /// Build state with the storage backend selected by the config
    pub async fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let store: SharedStore = match &config.storage {
            StorageConfig::Sqlite { path } => {
                let db = if path == ":memory:" {
                    Database::open_in_memory()?
                } else {
                    Database::open(path)?
                };
                Arc::new(DatabaseStore::new(db))
            }
            StorageConfig::JsonFiles { dir } => Arc::new(JsonFileStore::new(dir)?),
        };
        Ok(Self::with_store(config, store))
    }

    /// Construct state around an already-built store (used by tests)
    pub fn with_store(config: ServerConfig, store: SharedStore) -> Self {
        Self {
            store,
            config,
            run_locks: Arc::new(RunLocks::new()),
        }
    }

    /// Resolve the effective runner client. Stored settings override the
    /// process-level defaults; fails without a network attempt when neither
    /// yields a URL.
    pub async fn runner_client(&self) -> ServerResult<RunnerClient> {
        let settings = self.store.get_settings().await?;
        let runner = RunnerConfig::resolve(
            settings.runner_url.as_deref(),
            settings.runner_token.as_deref(),
            self.config.runner_base_url.as_deref(),
            self.config.runner_token.as_deref(),
        )?;
        Ok(RunnerClient::new(runner))
    }

    /// The runner URL that would be used, if any
    pub async fn resolved_runner_url(&self) -> Option<String> {
        let settings = self.store.get_settings().await.ok()?;
        settings
            .runner_url
            .or_else(|| self.config.runner_base_url.clone())
            .filter(|url| !url.is_empty())
    }
}
