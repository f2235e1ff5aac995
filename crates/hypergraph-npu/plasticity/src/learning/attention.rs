// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Attention modulation of learning rates

use ahash::AHashMap;
use hypergraph_config::{AttentionMode, LearningConfig};
use hypergraph_npu_neural::NeuronId;
use serde_json::json;
use tracing::debug;

use super::LearningSystem;

/// Per-step attention snapshot used by the Hebbian pass
#[derive(Debug, Clone)]
pub(crate) enum AttentionView {
    Off,
    Saliency { boost: f32 },
    ExternalMap { boost: f32, map: AHashMap<NeuronId, f32> },
}

impl AttentionView {
    /// `1 + (boost − 1) · w` with `w ∈ [0, 1]`
    pub fn factor(&self, src: NeuronId, tgt: NeuronId, pre: f32, post: f32) -> f32 {
        let (boost, w) = match self {
            Self::Off => return 1.0,
            Self::Saliency { boost } => (*boost, pre.max(post)),
            Self::ExternalMap { boost, map } => {
                let ws = map.get(&src).copied().unwrap_or(0.0);
                let wt = map.get(&tgt).copied().unwrap_or(0.0);
                (*boost, ws.max(wt))
            }
        };
        let w = if w.is_finite() { w.clamp(0.0, 1.0) } else { 0.0 };
        1.0 + (boost - 1.0) * w
    }
}

fn annealed(target: f32, remaining_ms: f32, window_ms: f32) -> f32 {
    if window_ms <= 0.0 {
        return target;
    }
    1.0 + (target - 1.0) * (remaining_ms / window_ms).clamp(0.0, 1.0)
}

impl LearningSystem {
    pub(crate) fn anneal_attention(&self, dt: f32) {
        let mut state = self.syn_state.lock();
        state.anneal_remaining_ms = (state.anneal_remaining_ms - dt * 1000.0).max(0.0);
    }

    /// Boost the Hebbian pass would use right now
    pub fn current_attention_boost(&self) -> f32 {
        let config = self.config.read();
        let state = self.syn_state.lock();
        match config.attention.attention_mode {
            AttentionMode::Saliency => annealed(
                state.attention_target,
                state.anneal_remaining_ms,
                config.attention.anneal_ms,
            ),
            AttentionMode::ExternalMap => state.attention_target,
            AttentionMode::Off => 1.0,
        }
    }

    pub(crate) fn attention_view(&self, config: &LearningConfig) -> AttentionView {
        if !config.attention.enable_attention_modulation {
            return AttentionView::Off;
        }
        let state = self.syn_state.lock();
        match config.attention.attention_mode {
            AttentionMode::Off => AttentionView::Off,
            AttentionMode::Saliency => AttentionView::Saliency {
                boost: annealed(
                    state.attention_target,
                    state.anneal_remaining_ms,
                    config.attention.anneal_ms,
                ),
            },
            AttentionMode::ExternalMap => AttentionView::ExternalMap {
                boost: state.attention_target,
                map: state.attention_map.clone(),
            },
        }
    }

    /// Install an attention map and boost
    ///
    /// Weights are clamped to `[0, 1]` and the boost to `[a_min, a_max]`;
    /// the anneal window restarts. An empty map only counts the call.
    pub fn apply_attention_modulation<I>(&self, map: I, boost: f32)
    where
        I: IntoIterator<Item = (NeuronId, f32)>,
    {
        let entries: AHashMap<NeuronId, f32> = map
            .into_iter()
            .map(|(id, w)| (id, if w.is_finite() { w.clamp(0.0, 1.0) } else { 0.0 }))
            .collect();
        if entries.is_empty() {
            self.stats.lock().attention_calls += 1;
            return;
        }

        let (a_min, a_max, window) = {
            let c = self.config.read();
            (c.attention.a_min, c.attention.a_max, c.attention.anneal_ms)
        };
        let boost = if boost.is_finite() {
            boost.clamp(a_min, a_max)
        } else {
            a_min.max(1.0).min(a_max)
        };
        let size = entries.len();
        {
            let mut state = self.syn_state.lock();
            state.attention_map = entries;
            state.attention_target = boost;
            state.anneal_remaining_ms = window;
        }
        {
            let mut stats = self.stats.lock();
            stats.attention_calls += 1;
            stats.attention_map_size = size;
        }
        debug!(target: "plasticity", neurons = size, boost, "attention map applied");
        self.emit("attention", json!({ "neurons": size, "boost": boost }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_modes() {
        let a = NeuronId(1);
        let b = NeuronId(2);
        assert_eq!(AttentionView::Off.factor(a, b, 1.0, 1.0), 1.0);
        let sal = AttentionView::Saliency { boost: 2.0 };
        assert!((sal.factor(a, b, 0.5, 0.25) - 1.5).abs() < 1e-6);
        let mut map = AHashMap::new();
        map.insert(b, 0.8);
        let ext = AttentionView::ExternalMap { boost: 3.0, map };
        assert!((ext.factor(a, b, 0.0, 0.0) - 2.6).abs() < 1e-6);
        assert_eq!(ext.factor(a, NeuronId(9), 1.0, 1.0), 1.0);
    }

    #[test]
    fn test_anneal_to_unit() {
        assert!((annealed(2.0, 500.0, 1000.0) - 1.5).abs() < 1e-6);
        assert_eq!(annealed(2.0, 0.0, 1000.0), 1.0);
        assert_eq!(annealed(2.0, 0.0, 0.0), 2.0);
    }
}
