// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Spike-timing dependent plasticity over this step's spikes

use std::sync::Arc;

use ahash::AHashMap;
use hypergraph_config::LearningConfig;
use hypergraph_npu_neural::synapse::{compute_stdp_batch, compute_stdp_weight_change};
use hypergraph_npu_neural::{NeuronId, StdpKernel, Synapse, STDP_TAU_MS};
use tracing::trace;

use super::{LearningSystem, RegionSynapses};
use crate::developmental::LearningKind;

/// Pairs at or above this count go through the batch kernel
pub const STDP_BATCH_THRESHOLD: usize = 64;

impl LearningSystem {
    /// Snapshot of spike times for neurons that fired this step
    fn fresh_spike_times(&self) -> AHashMap<NeuronId, f64> {
        let times = self.spike_times.lock();
        times
            .fresh
            .iter()
            .filter_map(|id| times.last.get(id).map(|t| (*id, *t)))
            .collect()
    }

    /// Pair rule on synapses whose endpoints both spiked since the last step
    pub(crate) fn apply_stdp(&self, config: &LearningConfig, cached: &[RegionSynapses]) {
        let spikes = self.fresh_spike_times();
        if spikes.len() < 2 {
            return;
        }
        let p_gate = self.effective_p_gate(config);
        let base = config.stdp_rate * config.stdp_rate_multiplier * self.competence_rate_scale(config);

        let mut pending: Vec<(Arc<Synapse>, f32, f32)> = Vec::new();
        let (mut skips, mut restricted) = (0u64, 0u64);
        {
            let mut rng = self.rng.lock();
            for entry in cached {
                let dev = self.developmental_scale(LearningKind::Stdp, entry.region.name());
                for synapse in &entry.synapses {
                    if synapse.is_modulatory() || !synapse.is_alive() {
                        continue;
                    }
                    let (Some(pre), Some(post)) = (
                        spikes.get(&synapse.source_id()),
                        spikes.get(&synapse.target_id()),
                    ) else {
                        continue;
                    };
                    let Some(dev) = dev else {
                        restricted += 1;
                        continue;
                    };
                    if !self.gate(p_gate, &mut rng) {
                        skips += 1;
                        continue;
                    }
                    pending.push((Arc::clone(synapse), (post - pre) as f32, base * dev));
                }
            }
        }

        let deltas: Vec<f32> = if pending.len() >= STDP_BATCH_THRESHOLD {
            let time_diffs: Vec<f32> = pending.iter().map(|p| p.1).collect();
            let etas: Vec<f32> = pending.iter().map(|p| p.2).collect();
            let mut out = vec![0.0; pending.len()];
            compute_stdp_batch(&time_diffs, &etas, STDP_TAU_MS, &mut out);
            out
        } else {
            pending
                .iter()
                .map(|(_, dt_ms, eta)| {
                    compute_stdp_weight_change(
                        *dt_ms,
                        &StdpKernel {
                            eta: *eta,
                            tau_ms: STDP_TAU_MS,
                        },
                    )
                })
                .collect()
        };

        let mut updates = 0u64;
        for ((synapse, _, _), delta) in pending.iter().zip(deltas) {
            if delta.is_finite() && delta != 0.0 {
                synapse.apply_delta(delta);
                updates += 1;
            }
        }

        trace!(target: "plasticity", updates, skips, restricted, "stdp pass");
        let mut stats = self.stats.lock();
        stats.stdp_updates += updates;
        stats.gate_skips += skips;
        stats.restricted_skips += restricted;
    }
}
