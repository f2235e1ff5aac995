// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # hypergraph-observability
//!
//! Logging, telemetry and persistence plumbing shared by every crate of the
//! substrate.
//!
//! ## Features
//! - `file-logging`: rolling file output alongside the console (desktop only)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod error;
pub mod init;
pub mod persistence;
pub mod telemetry;

pub use cli::*;
pub use error::{PersistenceError, TelemetryError};
pub use init::*;
pub use persistence::{LearningStatsRow, MemoryPersistence, PersistenceSink, RewardRow, RunId};
pub use telemetry::{
    CallbackTelemetry, JsonLinesTelemetry, MemoryTelemetry, TelemetryHandle, TelemetryRecord,
    TelemetrySink,
};

/// Tracing targets used by the substrate, one per subsystem
pub const KNOWN_TARGETS: &[&str] = &[
    "config",
    "region",
    "plasticity",
    "registry",
    "brain",
    "telemetry",
    "persistence",
];
