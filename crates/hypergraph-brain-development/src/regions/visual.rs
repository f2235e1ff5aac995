// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Visual cortex: V1 → V2 → V4 → IT bands with lateral inhibition

use std::any::Any;
use std::sync::Arc;

use hypergraph_npu_neural::Neuron;
use hypergraph_npu_region_engine::{ActivationPattern, Region, RegionBehavior, RegionBuilder, RegionType};
use serde_json::{json, Value};

use super::{mean_activation, partition};

pub const KEY: &str = "visual_cortex";

pub const BANDS: [&str; 4] = ["v1", "v2", "v4", "it"];

#[derive(Debug, Clone)]
pub struct VisualCortex {
    /// Pull toward the band mean for neurons below it, per second
    pub lateral_inhibition: f32,
    /// Drive from the previous band's mean, per second
    pub feedforward_gain: f32,
    band_means: [f32; 4],
}

impl Default for VisualCortex {
    fn default() -> Self {
        Self {
            lateral_inhibition: 2.0,
            feedforward_gain: 0.5,
            band_means: [0.0; 4],
        }
    }
}

impl VisualCortex {
    /// Mean activation per band, V1 first
    pub fn band_means(&self) -> [f32; 4] {
        self.band_means
    }
}

impl RegionBehavior for VisualCortex {
    fn kind(&self) -> &'static str {
        KEY
    }

    fn per_step_hook(&mut self, _region: &Region, neurons: &[Arc<Neuron>], dt: f32) {
        let bands = partition(neurons.len(), BANDS.len());
        let inhibit = (self.lateral_inhibition * dt).clamp(0.0, 1.0);
        let mut upstream = 0.0;
        for (b, range) in bands.into_iter().enumerate() {
            let band = &neurons[range];
            let mean = mean_activation(band);
            for n in band {
                n.modify_activation(|a| {
                    let suppressed = a - inhibit * (mean - a).max(0.0);
                    suppressed + self.feedforward_gain * upstream * dt
                });
            }
            self.band_means[b] = mean_activation(band);
            upstream = self.band_means[b];
        }
    }

    fn snapshot(&self) -> Value {
        json!({
            "bands": BANDS
                .iter()
                .zip(self.band_means)
                .map(|(name, m)| json!({ "band": name, "mean": m }))
                .collect::<Vec<_>>(),
        })
    }

    fn reset(&mut self) {
        self.band_means = [0.0; 4];
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
        .pattern(ActivationPattern::Layered)
        .neurons(neuron_count)
        .behavior(Box::new(VisualCortex::default()))
        .build()
}
