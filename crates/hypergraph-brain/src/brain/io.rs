// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sensory input, readout, bias modules and reward delivery

use hypergraph_npu_neural::NeuronId;
use hypergraph_npu_plasticity::REWARD_LIMIT;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::HypergraphBrain;

/// Context JSON as a value; non-JSON text is kept as a string
fn context_value(ctx_json: &str) -> Value {
    if ctx_json.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(ctx_json).unwrap_or_else(|_| Value::String(ctx_json.to_string()))
}

fn finite_clamp(v: f32, limit: f32) -> f32 {
    if v.is_finite() {
        v.clamp(-limit, limit)
    } else {
        0.0
    }
}

impl HypergraphBrain {
    /// Write `values` into the region mapped to `modality`
    ///
    /// Longer inputs are truncated and shorter ones leave the tail untouched.
    /// Returns how many activations were set, `None` for an unknown modality.
    pub fn feed_external_pattern(&self, modality: &str, values: &[f32]) -> Option<usize> {
        let Some(region) = self.modality_region(modality) else {
            debug!(target: "brain", modality, "feed to unmapped modality ignored");
            return None;
        };
        Some(region.feed_external_pattern(values))
    }

    /// Activations of the region mapped to `modality`, written into `out`
    ///
    /// `out` is left untouched and `false` returned for an unknown modality.
    pub fn readout_vector(&self, modality: &str, out: &mut Vec<f32>) -> bool {
        match self.modality_region(modality) {
            Some(region) => {
                region.readout_vector(out);
                true
            }
            None => false,
        }
    }

    pub fn readout(&self, modality: &str) -> Option<Vec<f32>> {
        self.modality_region(modality).map(|r| r.readout())
    }

    /// Neuromodulator `level ∈ [−1, 1]` on the region mapped to `modality`
    pub fn apply_neuromodulator(&self, modality: &str, level: f32) -> bool {
        let Some(region) = self.modality_region(modality) else {
            return false;
        };
        region.apply_neuromodulator(level);
        true
    }

    /// Forward an attention map to the learning system
    pub fn apply_attention_modulation<I>(&self, map: I, boost: f32)
    where
        I: IntoIterator<Item = (NeuronId, f32)>,
    {
        self.learning.apply_attention_modulation(map, boost);
    }

    /// Queue a reward for the next learning step and log it
    ///
    /// The learning system clamps `r` to `[−2, 2]`; the clamped value is what
    /// telemetry and persistence see.
    pub fn deliver_reward(&self, r: f32, source: &str, ctx_json: &str) {
        if !self.is_active() {
            return;
        }
        self.learning.apply_external_reward(r);
        let reward = finite_clamp(r, REWARD_LIMIT);
        let step = self.steps();

        self.telemetry.read().emit(
            "reward",
            step,
            json!({
                "reward": reward,
                "source": source,
                "context": context_value(ctx_json),
                "pending": self.learning.pending_reward(),
            }),
        );

        if let Some(binding) = self.persistence.read().as_ref() {
            let ts_ms = chrono::Utc::now().timestamp_millis();
            if let Err(e) = binding
                .sink
                .insert_reward_log(ts_ms, step, reward, source, ctx_json, binding.run_id)
            {
                warn!(target: "brain", step, source, error = %e, "reward log not persisted");
            }
        }
        debug!(target: "brain", step, reward, source, "reward delivered");
    }

    /// Deliver a survival (approach/avoid) signal clamped to `[−1, 1]`
    pub fn deliver_survival_modulation(&self, level: f32, ctx_json: &str) {
        if !self.is_active() {
            return;
        }
        let clamped = finite_clamp(level, 1.0);
        let raw = if level.is_finite() { json!(level) } else { Value::Null };
        self.telemetry.read().emit(
            "survival_mod",
            self.steps(),
            json!({ "level": clamped, "raw": raw }),
        );
        self.deliver_reward(clamped, "survival", ctx_json);
    }

    /// Turn a prediction error into an intrinsic reward and deliver it
    ///
    /// Returns the reward; nothing is delivered when it is zero (for example
    /// with intrinsic motivation disabled).
    pub fn deliver_intrinsic_reward(&self, prediction_error: f32, ctx_json: &str) -> f32 {
        if !self.is_active() {
            return 0.0;
        }
        let reward = self.learning.compute_intrinsic_reward(prediction_error);
        if reward != 0.0 {
            self.deliver_reward(reward, "intrinsic", ctx_json);
        }
        reward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_value_keeps_plain_text() {
        assert_eq!(context_value(r#"{"a":1}"#)["a"], 1);
        assert_eq!(context_value("hit wall"), Value::String("hit wall".to_string()));
        assert_eq!(context_value("  "), Value::Null);
    }

    #[test]
    fn test_finite_clamp() {
        assert_eq!(finite_clamp(3.0, 1.0), 1.0);
        assert_eq!(finite_clamp(-3.0, 2.0), -2.0);
        assert_eq!(finite_clamp(f32::NAN, 1.0), 0.0);
    }

    #[test]
    fn test_unknown_modality_is_absent() {
        let brain = HypergraphBrain::default();
        assert_eq!(brain.feed_external_pattern("touch", &[1.0]), None);
        let mut out = vec![9.0];
        assert!(!brain.readout_vector("touch", &mut out));
        assert_eq!(out, vec![9.0]);
        assert!(!brain.apply_neuromodulator("touch", 0.5));
    }
}
