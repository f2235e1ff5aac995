// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Prefrontal cortex: working-memory slots that hold activity after input stops

use std::any::Any;
use std::sync::Arc;

use hypergraph_npu_neural::Neuron;
use hypergraph_npu_region_engine::{ActivationPattern, Region, RegionBehavior, RegionBuilder, RegionType};
use serde_json::{json, Value};

use super::{mean_activation, partition};

pub const KEY: &str = "prefrontal_cortex";

/// Stored level below which a slot is released
const RELEASE_LEVEL: f32 = 0.05;

#[derive(Debug, Clone)]
pub struct PrefrontalCortex {
    /// Slot mean that captures a memory
    pub encode_threshold: f32,
    /// Fraction of the stored level imposed as an activation floor
    pub retention: f32,
    /// Per-second decay of stored levels
    pub decay: f32,
    slots: Vec<Option<f32>>,
}

impl Default for PrefrontalCortex {
    fn default() -> Self {
        Self::with_slots(4)
    }
}

impl PrefrontalCortex {
    pub fn with_slots(slots: usize) -> Self {
        Self {
            encode_threshold: 0.6,
            retention: 0.9,
            decay: 0.1,
            slots: vec![None; slots.max(1)],
        }
    }

    pub fn slots(&self) -> &[Option<f32>] {
        &self.slots
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn clear_slot(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }
}

impl RegionBehavior for PrefrontalCortex {
    fn kind(&self) -> &'static str {
        KEY
    }

    fn per_step_hook(&mut self, _region: &Region, neurons: &[Arc<Neuron>], dt: f32) {
        let fade = (-self.decay.max(0.0) * dt).exp();
        let ranges = partition(neurons.len(), self.slots.len());
        for (slot, range) in self.slots.iter_mut().zip(ranges) {
            let group = &neurons[range];
            if group.is_empty() {
                continue;
            }
            let mean = mean_activation(group);
            if mean >= self.encode_threshold {
                *slot = Some(slot.map_or(mean, |s| s.max(mean)));
            }
            if let Some(level) = slot {
                let floor = *level * self.retention;
                for n in group {
                    n.modify_activation(|a| a.max(floor));
                }
                *level *= fade;
                if *level < RELEASE_LEVEL {
                    *slot = None;
                }
            }
        }
    }

    fn snapshot(&self) -> Value {
        json!({ "slots": self.slots, "occupied": self.occupied() })
    }

    fn reset(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
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
        .pattern(ActivationPattern::Asynchronous)
        .neurons(neuron_count)
        .behavior(Box::new(PrefrontalCortex::default()))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_holds_activity() {
        let region = build("pfc", 8);
        let neurons = region.neurons();
        neurons[0].set_activation(0.8);
        neurons[1].set_activation(0.8);
        let mut pfc = PrefrontalCortex::default();
        pfc.per_step_hook(&region, &neurons, 0.1);
        assert_eq!(pfc.occupied(), 1);

        // Input gone; the slot floor keeps the group up
        neurons[0].set_activation(0.0);
        neurons[1].set_activation(0.0);
        pfc.per_step_hook(&region, &neurons, 0.1);
        assert!(neurons[0].activation() > 0.6);
        assert!(pfc.clear_slot(0));
        assert!(!pfc.clear_slot(0));
        assert!(!pfc.clear_slot(99));
    }

    #[test]
    fn test_slot_releases_after_decay() {
        let region = build("pfc", 4);
        let neurons = region.neurons();
        neurons[0].set_activation(1.0);
        let mut pfc = PrefrontalCortex {
            decay: 50.0,
            ..Default::default()
        };
        pfc.per_step_hook(&region, &neurons, 0.1);
        assert_eq!(pfc.occupied(), 0);
    }
}
