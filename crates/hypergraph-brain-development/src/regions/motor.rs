// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Motor cortex: population-vector readout with command smoothing
//!
//! Neuron `i` of `n` prefers direction `2π·i/n`. The population vector is
//! the activation-weighted mean of the preferred unit vectors; the issued
//! command follows it through a first-order filter.

use std::any::Any;
use std::f32::consts::TAU;
use std::sync::Arc;

use hypergraph_npu_neural::Neuron;
use hypergraph_npu_region_engine::{ActivationPattern, Region, RegionBehavior, RegionBuilder, RegionType};
use serde_json::{json, Value};

pub const KEY: &str = "motor_cortex";

#[derive(Debug, Clone)]
pub struct MotorCortex {
    /// Filter rate toward the population vector, per second
    pub smoothing: f32,
    population_vector: [f32; 2],
    command: [f32; 2],
}

impl Default for MotorCortex {
    fn default() -> Self {
        Self {
            smoothing: 5.0,
            population_vector: [0.0; 2],
            command: [0.0; 2],
        }
    }
}

/// Activation-weighted mean of preferred directions; zero when silent
pub fn population_vector(activations: &[f32]) -> [f32; 2] {
    let n = activations.len();
    let total: f32 = activations.iter().sum();
    if n == 0 || total <= f32::EPSILON {
        return [0.0; 2];
    }
    let (x, y) = activations
        .iter()
        .enumerate()
        .fold((0.0f32, 0.0f32), |(x, y), (i, a)| {
            let theta = TAU * i as f32 / n as f32;
            (x + a * theta.cos(), y + a * theta.sin())
        });
    [x / total, y / total]
}

impl MotorCortex {
    pub fn command(&self) -> [f32; 2] {
        self.command
    }

    pub fn population_vector(&self) -> [f32; 2] {
        self.population_vector
    }

    /// Command direction in radians, `None` while idle
    pub fn heading(&self) -> Option<f32> {
        let [x, y] = self.command;
        (x.hypot(y) > 1e-4).then(|| y.atan2(x))
    }
}

impl RegionBehavior for MotorCortex {
    fn kind(&self) -> &'static str {
        KEY
    }

    fn per_step_hook(&mut self, _region: &Region, neurons: &[Arc<Neuron>], dt: f32) {
        let acts: Vec<f32> = neurons.iter().map(|n| n.activation()).collect();
        self.population_vector = population_vector(&acts);
        let k = (self.smoothing * dt).clamp(0.0, 1.0);
        for (c, p) in self.command.iter_mut().zip(self.population_vector) {
            *c += k * (p - *c);
        }
    }

    fn snapshot(&self) -> Value {
        json!({
            "population_vector": self.population_vector,
            "command": self.command,
            "heading": self.heading(),
        })
    }

    fn reset(&mut self) {
        self.population_vector = [0.0; 2];
        self.command = [0.0; 2];
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
        .pattern(ActivationPattern::Competitive)
        .neurons(neuron_count)
        .behavior(Box::new(MotorCortex::default()))
        .build()
}
