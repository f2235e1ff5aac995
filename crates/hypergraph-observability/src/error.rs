// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Failure to deliver a telemetry record
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to serialize telemetry record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write telemetry record: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by a persistence backend
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Persistence backend unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown run id: {0}")]
    UnknownRun(i64),

    #[error("Write rejected: {0}")]
    Rejected(String),
}
