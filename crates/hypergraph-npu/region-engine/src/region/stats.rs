// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::Ordering;

use hypergraph_npu_neural::{NeuronState, RegionId, SpikeEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Region;
use crate::pattern::{ActivationPattern, RegionType};

/// What one `Region::process` call produced
#[derive(Debug, Clone, PartialEq)]
pub struct RegionStepReport {
    pub region_id: RegionId,
    /// Processing cycle this step completed (unchanged when idle)
    pub cycle: u64,
    pub spikes: Vec<SpikeEvent>,
    pub mean_activation: f32,
}

impl RegionStepReport {
    pub(crate) fn idle(region_id: RegionId, cycle: u64) -> Self {
        Self {
            region_id,
            cycle,
            spikes: Vec::new(),
            mean_activation: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    pub region_id: u64,
    pub name: String,
    pub region_type: RegionType,
    pub pattern: ActivationPattern,
    pub is_active: bool,
    pub neuron_count: usize,
    /// Neurons `Active` or `Firing`
    pub active_neurons: usize,
    pub firing_neurons: usize,
    /// Distinct synapses touching the region
    pub synapse_count: usize,
    pub internal_synapses: usize,
    pub input_connections: usize,
    pub output_connections: usize,
    pub inter_region_connections: usize,
    pub global_activation: f32,
    pub average_energy: f32,
    pub average_health: f32,
    pub metabolic_stress: f32,
    pub processing_cycles: u64,
    pub spikes_last_step: u64,
    pub spikes_total: u64,
    pub accelerator_fallbacks: u64,
    /// Auxiliary state of a specialised region
    pub behavior: Value,
}

impl Region {
    pub fn stats(&self) -> RegionStats {
        let neurons = self.neurons();
        let states: Vec<NeuronState> = neurons.iter().map(|n| n.state()).collect();
        let (synapses, internal, inputs, outputs, inter) = {
            let c = self.connections.lock();
            (
                c.unique().len(),
                c.internal.len(),
                c.input_count(),
                c.output_count(),
                c.inter_region_count(),
            )
        };
        let behavior = self
            .with_behavior(|b| b.snapshot())
            .unwrap_or(Value::Null);

        RegionStats {
            region_id: self.id.0,
            name: self.name.clone(),
            region_type: self.region_type,
            pattern: self.pattern(),
            is_active: self.is_active(),
            neuron_count: neurons.len(),
            active_neurons: states
                .iter()
                .filter(|s| matches!(s, NeuronState::Active | NeuronState::Firing))
                .count(),
            firing_neurons: states.iter().filter(|s| **s == NeuronState::Firing).count(),
            synapse_count: synapses,
            internal_synapses: internal,
            input_connections: inputs,
            output_connections: outputs,
            inter_region_connections: inter,
            global_activation: self.global_activation(),
            average_energy: self.average_energy(),
            average_health: self.average_health(),
            metabolic_stress: self.metabolic_stress(),
            processing_cycles: self.processing_cycles(),
            spikes_last_step: self.spikes_last_step.load(Ordering::Relaxed),
            spikes_total: self.spikes_total.load(Ordering::Relaxed),
            accelerator_fallbacks: self.accelerator_fallbacks(),
            behavior,
        }
    }
}
