// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Periodic weight-decay consolidation

use std::sync::Arc;

use hypergraph_config::LearningConfig;
use hypergraph_npu_neural::Synapse;
use rayon::prelude::*;
use serde_json::json;
use tracing::debug;

use super::{LearningSystem, RegionSynapses};

/// Synapse count above which decay runs on the rayon pool
const PARALLEL_DECAY_MIN: usize = 4096;

fn decay_one(synapse: &Synapse, rate: f32) -> bool {
    if synapse.is_modulatory() || !synapse.is_alive() {
        return false;
    }
    let w = synapse.weight();
    let delta = -rate * w;
    delta != 0.0 && synapse.apply_delta(delta) != 0.0
}

impl LearningSystem {
    /// Consolidate once `consolidation_interval` seconds have accumulated
    pub(crate) fn maybe_consolidate(&self, dt: f32, config: &LearningConfig, cached: &[RegionSynapses]) {
        let due = {
            let mut schedule = self.schedule.lock();
            schedule.consolidation_elapsed += dt;
            if schedule.consolidation_elapsed >= config.consolidation_interval {
                schedule.consolidation_elapsed = 0.0;
                true
            } else {
                false
            }
        };
        if due {
            self.consolidate(config.decay_rate, cached);
        }
    }

    /// `w ← w − decay_rate · w` on every synapse
    pub(crate) fn consolidate(&self, decay_rate: f32, cached: &[RegionSynapses]) -> usize {
        let synapses: Vec<&Arc<Synapse>> = cached.iter().flat_map(|e| e.synapses.iter()).collect();
        let changed = if decay_rate <= 0.0 {
            0
        } else if synapses.len() >= PARALLEL_DECAY_MIN {
            synapses
                .par_iter()
                .filter(|s| decay_one(s, decay_rate))
                .count()
        } else {
            synapses.iter().filter(|s| decay_one(s, decay_rate)).count()
        };

        debug!(target: "plasticity", synapses = synapses.len(), changed, decay_rate, "consolidation");
        self.stats.lock().consolidations += 1;
        self.emit(
            "consolidation",
            json!({ "synapses": synapses.len(), "changed": changed, "decay_rate": decay_rate }),
        );
        changed
    }
}
