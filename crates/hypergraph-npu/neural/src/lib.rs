// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Hypergraph Neural Data Model
//!
//! - **Types**: ids, errors, spike events
//! - **Neuron**: leaky-integrate dynamics, state machine, synapse lists
//! - **Synapse**: weak-endpoint edges, weight bounds, eligibility, STDP kernel
//! - **Metabolism**: mitochondrial energy/health kernel
//!
//! Everything here is lock-local: no operation takes more than one neuron's
//! or one synapse's mutex at a time.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod metabolism;
pub mod neuron;
pub mod synapse;
pub mod types;

pub use metabolism::{mito_step, mito_step_batch, MitoParams, MitoState};
pub use neuron::{Neuron, NeuronDynamics, NeuronParams, NeuronState, HEALTH_MIN};
pub use synapse::{
    compute_stdp_weight_change, PlasticityRule, StdpKernel, Synapse, SynapseState, SynapseType,
    WeightBounds, STDP_TAU_MS,
};
pub use types::{NeuralError, NeuronId, RegionId, Result, SpikeEvent, SynapseId};
