// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Reward-modulated plasticity on eligibility traces

use std::sync::atomic::Ordering;

use hypergraph_config::LearningConfig;
use hypergraph_npu_neural::Synapse;
use serde_json::json;
use tracing::debug;

use super::{LearningSystem, RegionSynapses};
use crate::developmental::LearningKind;

/// Magnitude limit on external and shaped rewards
pub const REWARD_LIMIT: f32 = 2.0;

fn clamp_reward(r: f32) -> f32 {
    if r.is_finite() {
        r.clamp(-REWARD_LIMIT, REWARD_LIMIT)
    } else {
        0.0
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// `1 − cos(v, ema)`; 1 when either side has no direction
fn novelty(v: &[f32], ema: &[f32]) -> f32 {
    if v.len() != ema.len() {
        return 1.0;
    }
    let (nv, ne) = (norm(v), norm(ema));
    if nv <= f32::EPSILON || ne <= f32::EPSILON {
        return 1.0;
    }
    let dot: f32 = v.iter().zip(ema).map(|(a, b)| a * b).sum();
    (1.0 - dot / (nv * ne)).clamp(0.0, 2.0)
}

fn update_ema(ema: &mut Vec<f32>, v: &[f32], beta: f32) {
    if ema.len() != v.len() {
        *ema = v.to_vec();
        return;
    }
    for (e, x) in ema.iter_mut().zip(v) {
        *e = (1.0 - beta) * *e + beta * x;
    }
}

fn variance(v: &[f32]) -> f32 {
    if v.is_empty() {
        return 0.0;
    }
    let n = v.len() as f32;
    let mean = v.iter().sum::<f32>() / n;
    v.iter().map(|x| (x - mean) * (x - mean)).sum::<f32>() / n
}

impl LearningSystem {
    /// Queue an external reward for the next step
    ///
    /// `r` is clamped to `[−2, 2]` and added to the pending total, which is
    /// itself kept in that range. Competence tracks the clamped value.
    pub fn apply_external_reward(&self, r: f32) {
        if !self.is_active() {
            return;
        }
        let r = clamp_reward(r);
        let _ = self
            .pending_reward
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some(clamp_reward(f32::from_bits(bits) + r).to_bits())
            });
        let config = self.config.read().clone();
        self.update_competence(r, &config);
        self.stats.lock().rewards_received += 1;
    }

    /// `e ← λ·e + η_elig·pre·post`
    pub fn note_pre_post(&self, synapse: &Synapse, pre: f32, post: f32) {
        if synapse.is_modulatory() || !synapse.is_alive() {
            return;
        }
        let (lambda, gain) = {
            let c = self.config.read();
            (c.reward.lambda, c.reward.eta_elig)
        };
        let next = lambda * synapse.eligibility() + gain * pre * post;
        synapse.set_eligibility(next);
    }

    pub fn set_mimicry_similarity(&self, similarity: f32) {
        let s = if similarity.is_finite() {
            similarity.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        self.syn_state.lock().mimicry = s;
    }

    /// `α·novelty + γ·task − η·var(acts) + μ·mimicry`, clamped to `[−2, 2]`
    ///
    /// Novelty compares each vector with its running mean; empty vectors
    /// contribute nothing. Both means then move by `β` and competence is
    /// updated with the result.
    pub fn compute_shaped_reward(&self, observation: &[f32], activations: &[f32], task_reward: f32) -> f32 {
        let config = self.config.read().clone();
        let rc = &config.reward;
        let task = if task_reward.is_finite() { task_reward } else { 0.0 };

        let (novel, mimicry) = {
            let mut state = self.syn_state.lock();
            let mut novel = 0.0;
            if !observation.is_empty() {
                novel += rc.novelty_obs_weight * novelty(observation, &state.obs_ema);
                update_ema(&mut state.obs_ema, observation, rc.ema_beta);
            }
            if !activations.is_empty() {
                novel += rc.novelty_sub_weight * novelty(activations, &state.sub_ema);
                update_ema(&mut state.sub_ema, activations, rc.ema_beta);
            }
            (novel, state.mimicry)
        };

        let r = clamp_reward(
            rc.alpha * novel + rc.gamma * task - rc.eta * variance(activations) + rc.mu * mimicry,
        );
        self.update_competence(r, &config);
        self.stats.lock().last_shaped_reward = r;
        r
    }

    /// `Δw = κ · R · e · global_lr` on every synapse with a trace
    pub(crate) fn apply_reward(&self, reward: f32, config: &LearningConfig, cached: &[RegionSynapses]) {
        let p_gate = self.effective_p_gate(config);
        let base = config.reward.kappa
            * reward
            * config.global_learning_rate
            * self.competence_rate_scale(config);

        let (mut updates, mut skips, mut restricted) = (0u64, 0u64, 0u64);
        for entry in cached {
            let dev = self.developmental_scale(LearningKind::Reward, entry.region.name());
            let mut rng = self.rng.lock();
            for synapse in &entry.synapses {
                if synapse.is_modulatory() || !synapse.is_alive() {
                    continue;
                }
                let e = synapse.eligibility();
                if e <= 0.0 {
                    continue;
                }
                let Some(dev) = dev else {
                    restricted += 1;
                    continue;
                };
                if !self.gate(p_gate, &mut rng) {
                    skips += 1;
                    continue;
                }
                let delta = base * e * dev;
                if delta.is_finite() && delta != 0.0 {
                    synapse.apply_delta(delta);
                    updates += 1;
                }
            }
        }

        debug!(target: "plasticity", reward, updates, skips, "reward applied");
        {
            let mut stats = self.stats.lock();
            stats.reward_updates += updates;
            stats.rewards_applied += 1;
            stats.gate_skips += skips;
            stats.restricted_skips += restricted;
        }
        self.emit(
            "reward_applied",
            json!({ "reward": reward, "updates": updates, "competence": self.competence() }),
        );
    }
}
