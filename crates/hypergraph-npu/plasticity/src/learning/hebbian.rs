// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Hebbian rule and homeostatic drift

use hypergraph_config::LearningConfig;
use hypergraph_npu_neural::{PlasticityRule, Synapse};
use tracing::trace;

use super::{LearningSystem, RegionSynapses};
use crate::developmental::LearningKind;

impl LearningSystem {
    /// `Δw = effective_lr · pre · post · dt` on every plastic synapse
    ///
    /// `effective_lr` folds together the synapse's own rate (relative to the
    /// default), the configured Hebbian and global rates, attention,
    /// developmental and competence scaling, and the target's energy gate.
    /// Coincident activity also feeds the eligibility trace.
    pub(crate) fn apply_hebbian(&self, dt: f32, config: &LearningConfig, cached: &[RegionSynapses]) {
        let view = self.attention_view(config);
        let p_gate = self.effective_p_gate(config);
        let base = config.hebbian_rate
            * config.global_learning_rate
            * self.competence_rate_scale(config);

        let (mut updates, mut skips, mut restricted) = (0u64, 0u64, 0u64);
        for entry in cached {
            let Some(dev) = self.developmental_scale(LearningKind::Hebbian, entry.region.name()) else {
                restricted += entry.synapses.len() as u64;
                continue;
            };
            let mut rng = self.rng.lock();
            for synapse in &entry.synapses {
                if synapse.is_modulatory() || synapse.rule() == PlasticityRule::None {
                    continue;
                }
                let Some((src, tgt)) = synapse.endpoints() else {
                    continue;
                };
                let (pre, post) = (src.activation(), tgt.activation());
                let coincidence = pre * post;
                if coincidence <= 0.0 {
                    continue;
                }
                synapse.accumulate_eligibility(pre, post, dt);
                if !self.gate(p_gate, &mut rng) {
                    skips += 1;
                    continue;
                }
                let lr = synapse.learning_rate() / Synapse::DEFAULT_LEARNING_RATE
                    * base
                    * view.factor(src.id(), tgt.id(), pre, post)
                    * dev
                    * tgt.energy_gate();
                let delta = lr * coincidence * dt;
                if delta.is_finite() && delta != 0.0 {
                    synapse.apply_delta(delta);
                    updates += 1;
                }
            }
            drop(rng);

            if config.homeostasis.enable_homeostasis {
                self.apply_homeostasis(entry, config);
            }
        }

        trace!(target: "plasticity", updates, skips, restricted, "hebbian pass");
        let mut stats = self.stats.lock();
        stats.hebbian_updates += updates;
        stats.gate_skips += skips;
        stats.restricted_skips += restricted;
    }

    /// `w += η_homeo · (1 − mean activation)` over one region's synapses
    pub(crate) fn apply_homeostasis(&self, entry: &RegionSynapses, config: &LearningConfig) {
        let Some(dev) = self.developmental_scale(LearningKind::Homeostasis, entry.region.name()) else {
            self.stats.lock().restricted_skips += entry.synapses.len() as u64;
            return;
        };
        let neurons = entry.region.neurons();
        if neurons.is_empty() {
            return;
        }
        let avg = neurons.iter().map(|n| n.activation()).sum::<f32>() / neurons.len() as f32;
        let delta = config.homeostasis.homeostasis_eta * (1.0 - avg) * dev;
        if delta == 0.0 || !delta.is_finite() {
            return;
        }
        let mut updates = 0u64;
        for synapse in &entry.synapses {
            if synapse.is_modulatory() || !synapse.is_alive() {
                continue;
            }
            synapse.apply_delta(delta);
            updates += 1;
        }
        self.stats.lock().homeostatic_updates += updates;
    }
}
