// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! HTTP client for the external Workbench task runner
//!
//! The runner is an independently deployed, loosely specified process; this
//! crate translates logical operations (run a task, browse files, execute a
//! shell command, probe health) into HTTP requests against its base URL and
//! normalizes every outcome into a tagged result. A malformed remote
//! response must never escape as a raw error to the HTTP surface.

pub mod client;
pub mod error;
pub mod output;

pub use client::*;
pub use error::*;
pub use output::extract_output_text;
