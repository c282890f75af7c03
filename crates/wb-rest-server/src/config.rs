// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,

    /// Storage backend selection
    pub storage: StorageConfig,

    /// Enable permissive CORS headers for development
    pub enable_cors: bool,

    /// Process-level default runner base URL; stored settings override it
    pub runner_base_url: Option<String>,

    /// Process-level default runner token; stored settings override it
    pub runner_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".parse().unwrap(),
            storage: StorageConfig::default(),
            enable_cors: false,
            runner_base_url: None,
            runner_token: None,
        }
    }
}

/// Storage backend selection
///
/// Both backends satisfy the same store contract; the choice is a
/// deployment decision, not a behavioral one.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// SQLite database at the given path; `:memory:` keeps state in-process
    Sqlite { path: String },
    /// Flat JSON documents (`tasks.json`, `events.json`, `settings.json`)
    /// in the given directory
    JsonFiles { dir: PathBuf },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: ":memory:".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_local_only() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:3001".parse().unwrap());
        assert!(!config.enable_cors);
        assert!(config.runner_base_url.is_none());
        assert!(matches!(config.storage, StorageConfig::Sqlite { ref path } if path == ":memory:"));
    }
}
