// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Workbench REST API server binary

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use wb_logging::{CliLogLevel, Level, LogFormat, init};
use wb_rest_server::{Server, ServerConfig, StorageConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address for the server
    #[arg(short, long, default_value = "127.0.0.1:3001")]
    bind: SocketAddr,

    /// Database path (SQLite); ":memory:" keeps state in-process
    #[arg(short, long, default_value = ":memory:")]
    database: String,

    /// Store state as flat JSON files in this directory instead of SQLite
    #[arg(long, conflicts_with = "database")]
    data_dir: Option<PathBuf>,

    /// Enable permissive CORS for development
    #[arg(long)]
    cors: bool,

    /// Default runner base URL; stored settings override it
    #[arg(long, env = "RUNNER_BASE_URL")]
    runner_url: Option<String>,

    /// Default runner auth token; stored settings override it
    #[arg(long, env = "RUNNER_TOKEN")]
    runner_token: Option<String>,

    /// Log level
    #[arg(short, long, value_enum, default_value_t = CliLogLevel::Info)]
    log_level: CliLogLevel,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Plaintext)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let default_level: Level = args.log_level.into();
    init("wb-rest-server", default_level, args.log_format)?;

    tracing::info!("Starting Workbench REST API server");

    let storage = match args.data_dir {
        Some(dir) => StorageConfig::JsonFiles { dir },
        None => StorageConfig::Sqlite {
            path: args.database,
        },
    };

    let config = ServerConfig {
        bind_addr: args.bind,
        storage,
        enable_cors: args.cors,
        runner_base_url: args.runner_url,
        runner_token: args.runner_token,
    };

    let server = Server::new(config).await?;
    server.run().await?;

    Ok(())
}
