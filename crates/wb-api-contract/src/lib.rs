//! Workbench REST API contract types and validation
//!
//! This crate defines the schema types and validation for the REST API.
//! These types are shared between the server, the test suites, and any
//! future client implementations.

pub mod error;
pub mod types;
pub mod validation;

pub use error::*;
pub use types::*;
