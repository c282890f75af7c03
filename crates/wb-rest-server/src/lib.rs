// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Workbench REST API server
//!
//! This crate implements the REST API for the Workbench automation
//! dashboard: CRUD over tasks and events, runner settings management, the
//! run-task flow, and proxy endpoints that forward file-browsing, shell,
//! and analysis requests to the external runner.

pub mod config;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod models;
pub mod server;
pub mod services;
pub mod state;

pub use config::{ServerConfig, StorageConfig};
pub use error::{ServerError, ServerResult};
pub use server::Server;
