// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Amygdala: emotional memories tagged with valence and arousal

use std::any::Any;
use std::sync::Arc;

use hypergraph_npu_neural::Neuron;
use hypergraph_npu_region_engine::{ActivationPattern, Region, RegionBehavior, RegionBuilder, RegionType};
use serde::Serialize;
use serde_json::{json, Value};

use super::{activations, cosine, mean_activation, with_variant};

pub const KEY: &str = "amygdala";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionalMemory {
    pub pattern: Vec<f32>,
    /// −1 aversive .. +1 appetitive
    pub valence: f32,
    pub arousal: f32,
    /// Fades per second; the memory is dropped at zero
    pub strength: f32,
}

#[derive(Debug, Clone)]
pub struct Amygdala {
    pub capacity: usize,
    pub match_threshold: f32,
    /// Per-second activation gain at full arousal
    pub arousal_gain: f32,
    pub forgetting_rate: f32,
    memories: Vec<EmotionalMemory>,
    valence: f32,
    arousal: f32,
}

impl Default for Amygdala {
    fn default() -> Self {
        Self {
            capacity: 64,
            match_threshold: 0.8,
            arousal_gain: 0.5,
            forgetting_rate: 0.001,
            memories: Vec::new(),
            valence: 0.0,
            arousal: 0.0,
        }
    }
}

impl Amygdala {
    /// Valence of the memory the current pattern matched, 0 if none
    pub fn valence(&self) -> f32 {
        self.valence
    }

    pub fn arousal(&self) -> f32 {
        self.arousal
    }

    pub fn memories(&self) -> &[EmotionalMemory] {
        &self.memories
    }

    /// Store `pattern` with a valence; the weakest memory goes when full
    pub fn tag(&mut self, pattern: Vec<f32>, valence: f32) {
        if self.capacity == 0 || pattern.is_empty() {
            return;
        }
        let valence = if valence.is_finite() { valence.clamp(-1.0, 1.0) } else { 0.0 };
        let arousal = (pattern.iter().sum::<f32>() / pattern.len() as f32).clamp(0.0, 1.0);
        if self.memories.len() >= self.capacity {
            if let Some(weakest) = self
                .memories
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.strength.total_cmp(&b.1.strength))
                .map(|(i, _)| i)
            {
                self.memories.swap_remove(weakest);
            }
        }
        self.memories.push(EmotionalMemory {
            pattern,
            valence,
            arousal,
            strength: 1.0,
        });
    }

    fn recall(&self, pattern: &[f32]) -> Option<&EmotionalMemory> {
        self.memories
            .iter()
            .map(|m| (m, cosine(pattern, &m.pattern) * m.strength))
            .filter(|(_, s)| *s >= self.match_threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(m, _)| m)
    }
}

impl RegionBehavior for Amygdala {
    fn kind(&self) -> &'static str {
        KEY
    }

    fn per_step_hook(&mut self, _region: &Region, neurons: &[Arc<Neuron>], dt: f32) {
        let pattern = activations(neurons);
        let (valence, arousal) = match self.recall(&pattern) {
            Some(m) => (m.valence, m.arousal.max(mean_activation(neurons))),
            None => (0.0, mean_activation(neurons)),
        };
        self.valence = valence;
        self.arousal = arousal;

        // Emotionally charged input is amplified
        if valence != 0.0 {
            let gain = 1.0 + self.arousal_gain * arousal * valence.abs() * dt;
            for n in neurons {
                n.modify_activation(|a| a * gain);
            }
        }

        let fade = self.forgetting_rate * dt;
        for m in &mut self.memories {
            m.strength = (m.strength - fade).max(0.0);
        }
        self.memories.retain(|m| m.strength > 0.0);
    }

    fn snapshot(&self) -> Value {
        json!({
            "valence": self.valence,
            "arousal": self.arousal,
            "memories": self.memories.len(),
        })
    }

    fn reset(&mut self) {
        self.memories.clear();
        self.valence = 0.0;
        self.arousal = 0.0;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Tag the region's current activity; `false` for non-amygdala regions
pub fn tag_current(region: &Region, valence: f32) -> bool {
    let pattern = activations(&region.neurons());
    with_variant(region, |a: &mut Amygdala| a.tag(pattern, valence)).is_some()
}

pub fn build(name: &str, neuron_count: usize) -> Arc<Region> {
    RegionBuilder::new(name)
        .region_type(RegionType::Subcortical)
        .pattern(ActivationPattern::Asynchronous)
        .neurons(neuron_count)
        .behavior(Box::new(Amygdala::default()))
        .build()
}
