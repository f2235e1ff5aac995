// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Running counters of the learning system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningStats {
    pub steps: u64,
    pub is_active: bool,

    pub hebbian_updates: u64,
    pub stdp_updates: u64,
    pub reward_updates: u64,
    pub homeostatic_updates: u64,
    /// Updates dropped by the `p_gate` Bernoulli
    pub gate_skips: u64,
    /// Updates dropped by developmental restriction
    pub restricted_skips: u64,

    pub consolidations: u64,
    pub structural_cycles: u64,
    pub pruned_total: u64,
    pub spawned_total: u64,
    pub grown_total: u64,

    pub rewards_received: u64,
    pub rewards_applied: u64,
    pub pending_reward: f32,
    pub competence: f32,
    pub last_shaped_reward: f32,
    pub last_intrinsic_reward: f32,

    pub attention_boost: f32,
    pub attention_calls: u64,
    pub attention_map_size: usize,

    /// Distinct synapses seen in the last step
    pub synapses_tracked: usize,
    pub regions_tracked: usize,
}
