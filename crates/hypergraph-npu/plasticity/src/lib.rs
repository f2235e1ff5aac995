// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Hypergraph Plasticity
//!
//! Synaptic and structural learning over a set of regions.
//!
//! ## Features
//! - Hebbian updates gated by attention, development, competence and energy
//! - STDP on spikes recorded during the step
//! - Reward-modulated plasticity on per-synapse eligibility traces
//! - Shaped and intrinsic rewards
//! - Homeostatic drift and weight-decay consolidation
//! - Structural plasticity (prune, spawn, grow) under a metabolic gate
//!
//! ## Example
//! ```
//! use hypergraph_config::LearningConfig;
//! use hypergraph_npu_plasticity::LearningSystem;
//!
//! let learning = LearningSystem::new(LearningConfig::default());
//! learning.apply_external_reward(5.0);
//! assert_eq!(learning.pending_reward(), 2.0);
//! learning.update_learning(0.016, &[]);
//! assert_eq!(learning.pending_reward(), 0.0);
//! ```

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod developmental;
pub mod intrinsic;
pub mod learning;
pub mod stats;

pub use developmental::{DevelopmentalModulator, LearningKind, LearningModulation};
pub use intrinsic::{IntrinsicMotivation, IntrinsicSignal};
pub use learning::{
    LearningSystem, StructuralReport, AUTO_ELIGIBILITY_BUMP, REWARD_LIMIT, STDP_BATCH_THRESHOLD,
};
pub use stats::LearningStats;
