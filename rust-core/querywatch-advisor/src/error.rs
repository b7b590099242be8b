// SPDX-License-Identifier: PMPL-1.0-or-later
//! Advisor error types.
//!
//! The analysis paths themselves never fail; these errors only surface at
//! explicit seams such as configuration loading, key lookup and starting the
//! background monitor.

use thiserror::Error;

/// Errors returned by the advisory engine.
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("unknown operation kind: {0}")]
    UnknownOperationKind(String),

    #[error("unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("no async runtime available: {0}")]
    Runtime(String),

    #[error("metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
