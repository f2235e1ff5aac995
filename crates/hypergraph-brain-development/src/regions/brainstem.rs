// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Brainstem: arousal level and autonomic rhythms
//!
//! The first third of the population follows a cardiac rhythm, the second
//! a respiratory one. The remainder is held at an arousal-dependent floor.

use std::any::Any;
use std::f32::consts::TAU;
use std::sync::Arc;

use hypergraph_npu_neural::Neuron;
use hypergraph_npu_region_engine::{ActivationPattern, Region, RegionBehavior, RegionBuilder, RegionType};
use serde_json::{json, Value};

use super::{mean_activation, partition};

pub const KEY: &str = "brainstem";

#[derive(Debug, Clone)]
pub struct Brainstem {
    pub heart_rate_hz: f32,
    pub respiration_hz: f32,
    /// Rhythm amplitude added per second at peak
    pub rhythm_gain: f32,
    /// EMA rate of arousal toward mean activity, per second
    pub arousal_rate: f32,
    pub arousal_floor: f32,
    heart_phase: f32,
    breath_phase: f32,
    arousal: f32,
}

impl Default for Brainstem {
    fn default() -> Self {
        Self {
            heart_rate_hz: 1.2,
            respiration_hz: 0.25,
            rhythm_gain: 0.5,
            arousal_rate: 0.5,
            arousal_floor: 0.1,
            heart_phase: 0.0,
            breath_phase: 0.0,
            arousal: 0.0,
        }
    }
}

impl Brainstem {
    pub fn arousal(&self) -> f32 {
        self.arousal
    }

    /// Cardiac and respiratory phases in cycles, each in `[0, 1)`
    pub fn phases(&self) -> (f32, f32) {
        (self.heart_phase, self.breath_phase)
    }
}

fn rhythm(phase: f32) -> f32 {
    0.5 * (1.0 + (TAU * phase).sin())
}

impl RegionBehavior for Brainstem {
    fn kind(&self) -> &'static str {
        KEY
    }

    fn per_step_hook(&mut self, _region: &Region, neurons: &[Arc<Neuron>], dt: f32) {
        self.heart_phase = (self.heart_phase + self.heart_rate_hz * dt).fract();
        self.breath_phase = (self.breath_phase + self.respiration_hz * dt).fract();

        let groups = partition(neurons.len(), 3);
        let heart = rhythm(self.heart_phase) * self.rhythm_gain * dt;
        for n in &neurons[groups[0].clone()] {
            n.modify_activation(|a| a + heart);
        }
        let breath = rhythm(self.breath_phase) * self.rhythm_gain * dt;
        for n in &neurons[groups[1].clone()] {
            n.modify_activation(|a| a + breath);
        }

        let k = (self.arousal_rate * dt).clamp(0.0, 1.0);
        self.arousal = (self.arousal + k * (mean_activation(neurons) - self.arousal)).clamp(0.0, 1.0);
        let floor = self.arousal_floor * (1.0 + self.arousal);
        for n in &neurons[groups[2].clone()] {
            n.modify_activation(|a| a.max(floor));
        }
    }

    fn snapshot(&self) -> Value {
        json!({
            "arousal": self.arousal,
            "heart_phase": self.heart_phase,
            "breath_phase": self.breath_phase,
        })
    }

    fn reset(&mut self) {
        self.heart_phase = 0.0;
        self.breath_phase = 0.0;
        self.arousal = 0.0;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub fn build(name: &str, neuron_count: usize) -> Arc<Region> {
    RegionBuilder::new(name)
        .region_type(RegionType::Brainstem)
        .pattern(ActivationPattern::Oscillatory)
        .neurons(neuron_count)
        .behavior(Box::new(Brainstem::default()))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_wrap_and_floor_holds() {
        let region = build("bs", 9);
        let neurons = region.neurons();
        let mut bs = Brainstem::default();
        for _ in 0..100 {
            bs.per_step_hook(&region, &neurons, 0.05);
        }
        let (h, b) = bs.phases();
        assert!((0.0..1.0).contains(&h) && (0.0..1.0).contains(&b));
        for n in &neurons[6..] {
            assert!(n.activation() >= 0.1 - 1e-6);
        }
        assert!(bs.arousal() > 0.0);
    }
}
