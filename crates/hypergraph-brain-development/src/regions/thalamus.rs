// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Thalamus: gated sensory relay channels

use std::any::Any;
use std::sync::Arc;

use hypergraph_npu_neural::Neuron;
use hypergraph_npu_region_engine::{ActivationPattern, Region, RegionBehavior, RegionBuilder, RegionType};
use serde_json::{json, Value};

use super::{mean_activation, partition, with_variant};

pub const KEY: &str = "thalamus";

#[derive(Debug, Clone)]
pub struct Thalamus {
    /// Per-second attenuation of a fully closed channel
    pub suppression_rate: f32,
    gates: Vec<f32>,
    relay: Vec<f32>,
}

impl Default for Thalamus {
    fn default() -> Self {
        Self::with_channels(4)
    }
}

impl Thalamus {
    pub fn with_channels(channels: usize) -> Self {
        let channels = channels.max(1);
        Self {
            suppression_rate: 5.0,
            gates: vec![1.0; channels],
            relay: vec![0.0; channels],
        }
    }

    pub fn channels(&self) -> usize {
        self.gates.len()
    }

    /// Open (1) or close (0) a channel; `false` for an unknown channel
    pub fn set_gate(&mut self, channel: usize, gate: f32) -> bool {
        let gate = if gate.is_finite() { gate.clamp(0.0, 1.0) } else { 0.0 };
        match self.gates.get_mut(channel) {
            Some(g) => {
                *g = gate;
                true
            }
            None => false,
        }
    }

    pub fn gates(&self) -> &[f32] {
        &self.gates
    }

    /// Gated channel output from the last step
    pub fn relay_output(&self) -> &[f32] {
        &self.relay
    }
}

impl RegionBehavior for Thalamus {
    fn kind(&self) -> &'static str {
        KEY
    }

    fn per_step_hook(&mut self, _region: &Region, neurons: &[Arc<Neuron>], dt: f32) {
        let ranges = partition(neurons.len(), self.gates.len());
        for (c, range) in ranges.into_iter().enumerate() {
            let channel = &neurons[range];
            let gate = self.gates[c];
            let keep = 1.0 - ((1.0 - gate) * self.suppression_rate * dt).clamp(0.0, 1.0);
            if keep < 1.0 {
                for n in channel {
                    n.modify_activation(|a| a * keep);
                }
            }
            self.relay[c] = gate * mean_activation(channel);
        }
    }

    fn snapshot(&self) -> Value {
        json!({ "gates": self.gates, "relay": self.relay })
    }

    fn reset(&mut self) {
        self.gates.iter_mut().for_each(|g| *g = 1.0);
        self.relay.iter_mut().for_each(|r| *r = 0.0);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// [`Thalamus::set_gate`] on a region; `false` if not a thalamus or no such channel
pub fn set_gate(region: &Region, channel: usize, gate: f32) -> bool {
    with_variant(region, |t: &mut Thalamus| t.set_gate(channel, gate)).unwrap_or(false)
}

pub fn build(name: &str, neuron_count: usize) -> Arc<Region> {
    RegionBuilder::new(name)
        .region_type(RegionType::Subcortical)
        .pattern(ActivationPattern::Synchronous)
        .neurons(neuron_count)
        .behavior(Box::new(Thalamus::default()))
        .build()
}
