//! # Migration Common Library
//!
//! Shared code for the migration report tooling:
//! - Error and result types
//! - Configuration loading and logs directory resolution
//! - Tracing subscriber setup

pub mod config;
pub mod error;
pub mod logging;

pub use config::{FailurePolicy, LoggingConfig, ReportConfig};
pub use error::{Error, Result};
