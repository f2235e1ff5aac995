// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Hypergraph Region Engine
//!
//! - **Region**: neuron population, mito array, connection table, step
//! - **Patterns**: synchronous, asynchronous, layered, competitive, oscillatory
//! - **Backends**: scalar and batched mitochondrial kernels with fallback
//! - **Behavior**: hook for specialised regions
//! - **Builder**: region factory with automatic or explicit ids

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod behavior;
pub mod builder;
pub mod error;
pub mod pattern;
pub mod region;

pub use backend::{
    select_backend, BackendConfig, BackendDecision, BackendType, BatchedBackend, MitoBackend,
    ScalarBackend,
};
pub use behavior::RegionBehavior;
pub use builder::RegionBuilder;
pub use error::BackendError;
pub use pattern::{ActivationPattern, RegionType};
pub use region::{Region, RegionStats, RegionStepReport, NEUROMODULATOR_BIAS};
