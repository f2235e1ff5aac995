// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Somatosensory cortex: body map of receptive fields

use std::any::Any;
use std::sync::Arc;

use hypergraph_npu_neural::Neuron;
use hypergraph_npu_region_engine::{ActivationPattern, Region, RegionBehavior, RegionBuilder, RegionType};
use serde_json::{Map, Value};

use super::{mean_activation, partition};

pub const KEY: &str = "somatosensory_cortex";

pub const BODY_PARTS: [&str; 6] = ["head", "torso", "left_arm", "right_arm", "left_leg", "right_leg"];

#[derive(Debug, Clone)]
pub struct SomatosensoryCortex {
    /// Per-second pull of each neuron toward its receptive field mean
    pub field_coupling: f32,
    intensity: [f32; 6],
}

impl Default for SomatosensoryCortex {
    fn default() -> Self {
        Self {
            field_coupling: 1.0,
            intensity: [0.0; 6],
        }
    }
}

impl SomatosensoryCortex {
    pub fn intensity(&self, part: &str) -> Option<f32> {
        BODY_PARTS
            .iter()
            .position(|p| *p == part)
            .map(|i| self.intensity[i])
    }

    /// Set every neuron in a part's field; `false` for unknown parts
    pub fn touch(&self, region: &Region, part: &str, level: f32) -> bool {
        let Some(index) = BODY_PARTS.iter().position(|p| *p == part) else {
            return false;
        };
        let neurons = region.neurons();
        let range = partition(neurons.len(), BODY_PARTS.len()).swap_remove(index);
        for n in &neurons[range] {
            n.set_activation(level);
        }
        true
    }
}

impl RegionBehavior for SomatosensoryCortex {
    fn kind(&self) -> &'static str {
        KEY
    }

    fn per_step_hook(&mut self, _region: &Region, neurons: &[Arc<Neuron>], dt: f32) {
        let k = (self.field_coupling * dt).clamp(0.0, 1.0);
        for (i, range) in partition(neurons.len(), BODY_PARTS.len()).into_iter().enumerate() {
            let field = &neurons[range];
            let mean = mean_activation(field);
            for n in field {
                n.modify_activation(|a| a + k * (mean - a));
            }
            self.intensity[i] = mean;
        }
    }

    fn snapshot(&self) -> Value {
        let map: Map<String, Value> = BODY_PARTS
            .iter()
            .zip(self.intensity)
            .map(|(p, v)| (p.to_string(), Value::from(v)))
            .collect();
        Value::Object(map)
    }

    fn reset(&mut self) {
        self.intensity = [0.0; 6];
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
        .region_type(RegionType::Cortical)
        .pattern(ActivationPattern::Synchronous)
        .neurons(neuron_count)
        .behavior(Box::new(SomatosensoryCortex::default()))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_maps_to_part() {
        let region = build("s1", 12);
        let mut sc = SomatosensoryCortex::default();
        assert!(sc.touch(&region, "left_arm", 0.8));
        assert!(!sc.touch(&region, "tail", 1.0));
        sc.per_step_hook(&region, &region.neurons(), 0.0);
        assert!((sc.intensity("left_arm").unwrap() - 0.8).abs() < 1e-6);
        assert_eq!(sc.intensity("head"), Some(0.0));
        assert_eq!(sc.snapshot()["left_arm"].as_f64().map(|v| v > 0.7), Some(true));
    }
}
