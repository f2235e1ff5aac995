// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Leaky-integrate neuron
//!
//! ```text
//! I       = Σ sign · w · pre_activation          (modulatory inputs skipped)
//! a(t+dt) = clamp(a(t) · exp(−decay · dt) + I, 0, 1)
//!
//! Inactive ─drive─▶ Active ─a ≥ θ─▶ Firing ─next step─▶ Refractory ─window─▶ Inactive
//! ```
//!
//! Lock discipline: the input sum is gathered before the neuron's own
//! dynamics mutex is taken, so a self-loop never re-enters a held lock. The
//! synapse-list mutex is never held while calling into another neuron.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::synapse::Synapse;
use crate::types::{NeuralError, NeuronId, Result, SpikeEvent, SynapseId};

/// Lowest mitochondrial health a neuron can drift to
pub const HEALTH_MIN: f32 = 0.1;

/// Activation above which a non-firing neuron counts as `Active`
pub const ACTIVITY_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NeuronState {
    #[default]
    Inactive,
    Active,
    Firing,
    Refractory,
}

/// Construction parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeuronParams {
    pub threshold: f32,
    pub decay_rate: f32,
    /// Seconds
    pub refractory_period: f32,
    pub initial_energy: f32,
    pub initial_health: f32,
}

impl Default for NeuronParams {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            decay_rate: 0.1,
            refractory_period: 0.002,
            initial_energy: 1.0,
            initial_health: 1.0,
        }
    }
}

/// Scalar state of a neuron
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeuronDynamics {
    pub activation: f32,
    pub state: NeuronState,
    pub energy: f32,
    pub mito_health: f32,
    pub threshold: f32,
    pub decay_rate: f32,
    pub refractory_period: f32,
    pub refractory_remaining: f32,
    pub clock_ms: f64,
    pub last_spike_ms: Option<f64>,
    pub spike_count: u64,
}

#[derive(Default)]
struct SynapseLinks {
    inputs: Vec<Arc<Synapse>>,
    outputs: Vec<Arc<Synapse>>,
}

pub struct Neuron {
    id: NeuronId,
    dynamics: Mutex<NeuronDynamics>,
    links: Mutex<SynapseLinks>,
}

impl fmt::Debug for Neuron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.dynamics.lock();
        f.debug_struct("Neuron")
            .field("id", &self.id)
            .field("activation", &d.activation)
            .field("state", &d.state)
            .field("energy", &d.energy)
            .finish()
    }
}

#[inline]
fn unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

impl Neuron {
    pub fn new(params: NeuronParams) -> Arc<Self> {
        Arc::new(Self {
            id: NeuronId::next(),
            dynamics: Mutex::new(NeuronDynamics {
                activation: 0.0,
                state: NeuronState::Inactive,
                energy: unit(params.initial_energy),
                mito_health: params.initial_health.clamp(HEALTH_MIN, 1.0),
                threshold: params.threshold,
                decay_rate: params.decay_rate.max(0.0),
                refractory_period: params.refractory_period.max(0.0),
                refractory_remaining: 0.0,
                clock_ms: 0.0,
                last_spike_ms: None,
                spike_count: 0,
            }),
            links: Mutex::new(SynapseLinks::default()),
        })
    }

    #[inline]
    pub fn id(&self) -> NeuronId {
        self.id
    }

    pub fn snapshot(&self) -> NeuronDynamics {
        *self.dynamics.lock()
    }

    pub fn activation(&self) -> f32 {
        self.dynamics.lock().activation
    }

    /// Clamp to [0,1] and drop to `Inactive` so the next step can cross threshold
    pub fn set_activation(&self, value: f32) {
        let mut d = self.dynamics.lock();
        d.activation = unit(value);
        d.state = NeuronState::Inactive;
        d.refractory_remaining = 0.0;
    }

    /// Rewrite activation in place, keeping the state machine untouched
    pub fn modify_activation<F>(&self, f: F) -> f32
    where
        F: FnOnce(f32) -> f32,
    {
        let mut d = self.dynamics.lock();
        d.activation = unit(f(d.activation));
        d.activation
    }

    pub fn state(&self) -> NeuronState {
        self.dynamics.lock().state
    }

    pub fn energy(&self) -> f32 {
        self.dynamics.lock().energy
    }

    pub fn health(&self) -> f32 {
        self.dynamics.lock().mito_health
    }

    /// `energy² · health`
    pub fn energy_gate(&self) -> f32 {
        let d = self.dynamics.lock();
        d.energy * d.energy * d.mito_health
    }

    pub fn set_metabolic(&self, energy: f32, health: f32) {
        let mut d = self.dynamics.lock();
        d.energy = unit(energy);
        d.mito_health = if health.is_nan() {
            HEALTH_MIN
        } else {
            health.clamp(HEALTH_MIN, 1.0)
        };
    }

    pub fn threshold(&self) -> f32 {
        self.dynamics.lock().threshold
    }

    pub fn set_threshold(&self, threshold: f32) {
        self.dynamics.lock().threshold = threshold;
    }

    pub fn last_spike_ms(&self) -> Option<f64> {
        self.dynamics.lock().last_spike_ms
    }

    pub fn spike_count(&self) -> u64 {
        self.dynamics.lock().spike_count
    }

    /// Clear transient state; metabolism and wiring are kept
    pub fn reset(&self) {
        let mut d = self.dynamics.lock();
        d.activation = 0.0;
        d.state = NeuronState::Inactive;
        d.refractory_remaining = 0.0;
        d.last_spike_ms = None;
    }

    /// Advance by `dt` seconds on the neuron's own clock
    pub fn process(&self, dt: f32) -> Option<SpikeEvent> {
        let now_ms = self.dynamics.lock().clock_ms + dt as f64 * 1000.0;
        self.process_at(dt, now_ms)
    }

    /// Advance by `dt` seconds with the caller's clock (ms) after the step
    pub fn process_at(&self, dt: f32, now_ms: f64) -> Option<SpikeEvent> {
        let drive = self.input_drive();

        let mut d = self.dynamics.lock();
        let decayed = d.activation * (-d.decay_rate * dt.max(0.0)).exp();
        d.activation = unit(decayed + drive);
        self.advance_state(&mut d, dt, now_ms)
    }

    /// Run only the threshold/refractory state machine
    ///
    /// Used by activation patterns that set activations directly.
    pub fn fire_check(&self, dt: f32, now_ms: f64) -> Option<SpikeEvent> {
        let mut d = self.dynamics.lock();
        self.advance_state(&mut d, dt, now_ms)
    }

    fn advance_state(&self, d: &mut NeuronDynamics, dt: f32, now_ms: f64) -> Option<SpikeEvent> {
        d.clock_ms = now_ms;

        if d.state == NeuronState::Firing {
            d.state = NeuronState::Refractory;
        }
        if d.state == NeuronState::Refractory {
            d.refractory_remaining -= dt;
            if d.refractory_remaining <= 0.0 {
                d.refractory_remaining = 0.0;
                d.state = NeuronState::Inactive;
            }
            return None;
        }

        if d.activation >= d.threshold {
            d.state = NeuronState::Firing;
            d.refractory_remaining = d.refractory_period;
            d.last_spike_ms = Some(now_ms);
            d.spike_count += 1;
            return Some(SpikeEvent {
                neuron_id: self.id,
                time_ms: now_ms,
            });
        }

        d.state = if d.activation > ACTIVITY_EPSILON {
            NeuronState::Active
        } else {
            NeuronState::Inactive
        };
        None
    }

    /// Signed weighted sum of presynaptic activations
    pub fn input_drive(&self) -> f32 {
        let inputs = self.input_synapses();
        inputs
            .iter()
            .filter(|s| !s.is_modulatory())
            .filter_map(|s| {
                let pre = s.source()?;
                Some(s.kind().sign() * s.weight() * pre.activation())
            })
            .sum()
    }

    pub fn input_synapses(&self) -> Vec<Arc<Synapse>> {
        self.links.lock().inputs.clone()
    }

    pub fn output_synapses(&self) -> Vec<Arc<Synapse>> {
        self.links.lock().outputs.clone()
    }

    pub fn input_count(&self) -> usize {
        self.links.lock().inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.links.lock().outputs.len()
    }

    /// Existing outgoing synapse to `target`, if any
    pub fn output_to(&self, target: NeuronId) -> Option<Arc<Synapse>> {
        self.links
            .lock()
            .outputs
            .iter()
            .find(|s| s.target_id() == target && !s.is_retired())
            .cloned()
    }

    /// Attach an outgoing synapse unless an edge to the same target exists
    ///
    /// Check and insert happen under one lock, so concurrent wiring of the
    /// same pair yields a single edge. Returns the synapse that now
    /// represents the edge and whether it is the one passed in.
    ///
    /// # Errors
    ///
    /// `EndpointMismatch` if the synapse does not originate here.
    pub fn attach_output_unique(&self, synapse: &Arc<Synapse>) -> Result<(Arc<Synapse>, bool)> {
        if synapse.source_id() != self.id {
            return Err(NeuralError::EndpointMismatch {
                synapse: synapse.id(),
                neuron: self.id,
                side: "source",
            });
        }
        let mut links = self.links.lock();
        if let Some(existing) = links
            .outputs
            .iter()
            .find(|s| s.target_id() == synapse.target_id() && !s.is_retired())
        {
            return Ok((Arc::clone(existing), false));
        }
        links.outputs.push(Arc::clone(synapse));
        Ok((Arc::clone(synapse), true))
    }

    /// Attach an incoming synapse
    ///
    /// Returns `Ok(false)` if it is already attached.
    ///
    /// # Errors
    ///
    /// `EndpointMismatch` if the synapse does not target this neuron.
    pub fn add_input_synapse(&self, synapse: &Arc<Synapse>) -> Result<bool> {
        if synapse.target_id() != self.id {
            return Err(NeuralError::EndpointMismatch {
                synapse: synapse.id(),
                neuron: self.id,
                side: "target",
            });
        }
        let mut links = self.links.lock();
        if links.inputs.iter().any(|s| s.id() == synapse.id()) {
            return Ok(false);
        }
        links.inputs.push(Arc::clone(synapse));
        Ok(true)
    }

    /// Attach an outgoing synapse
    ///
    /// Returns `Ok(false)` if it is already attached.
    ///
    /// # Errors
    ///
    /// `EndpointMismatch` if the synapse does not originate here.
    pub fn add_output_synapse(&self, synapse: &Arc<Synapse>) -> Result<bool> {
        if synapse.source_id() != self.id {
            return Err(NeuralError::EndpointMismatch {
                synapse: synapse.id(),
                neuron: self.id,
                side: "source",
            });
        }
        let mut links = self.links.lock();
        if links.outputs.iter().any(|s| s.id() == synapse.id()) {
            return Ok(false);
        }
        links.outputs.push(Arc::clone(synapse));
        Ok(true)
    }

    pub fn remove_input_synapse(&self, id: SynapseId) -> bool {
        let mut links = self.links.lock();
        let before = links.inputs.len();
        links.inputs.retain(|s| s.id() != id);
        links.inputs.len() != before
    }

    pub fn remove_output_synapse(&self, id: SynapseId) -> bool {
        let mut links = self.links.lock();
        let before = links.outputs.len();
        links.outputs.retain(|s| s.id() != id);
        links.outputs.len() != before
    }

    /// Empty both lists and hand back what was attached
    pub fn detach_all(&self) -> Vec<Arc<Synapse>> {
        let mut links = self.links.lock();
        let mut all = std::mem::take(&mut links.inputs);
        all.append(&mut links.outputs);
        all
    }

    /// Drop synapses whose other endpoint is gone; returns how many
    pub fn retain_live_synapses(&self) -> usize {
        let mut links = self.links.lock();
        let before = links.inputs.len() + links.outputs.len();
        links.inputs.retain(|s| s.is_alive());
        links.outputs.retain(|s| s.is_alive());
        before - links.inputs.len() - links.outputs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synapse::{SynapseType, WeightBounds};
    use proptest::prelude::*;

    fn connect(a: &Arc<Neuron>, b: &Arc<Neuron>, w: f32, kind: SynapseType) -> Arc<Synapse> {
        let s = Synapse::new(a, b, w, kind, WeightBounds::default());
        a.add_output_synapse(&s).unwrap();
        b.add_input_synapse(&s).unwrap();
        s
    }

    #[test]
    fn test_leak_only() {
        let n = Neuron::new(NeuronParams {
            decay_rate: 0.1,
            ..Default::default()
        });
        n.set_activation(0.5);
        assert!(n.process(0.1).is_none());

        let a = n.activation();
        assert!(a < 0.5);
        assert!(a >= 0.0);
        assert!((a - 0.5 * (-0.01f32).exp()).abs() < 1e-6);
        assert_eq!(n.state(), NeuronState::Active);
    }

    #[test]
    fn test_fire_then_refractory_then_inactive() {
        let n = Neuron::new(NeuronParams {
            threshold: 0.5,
            refractory_period: 0.005,
            ..Default::default()
        });
        n.set_activation(1.0);

        let spike = n.process(0.01).expect("should fire");
        assert_eq!(spike.neuron_id, n.id());
        assert!((spike.time_ms - 10.0).abs() < 1e-4);
        assert_eq!(n.state(), NeuronState::Firing);
        assert_eq!(n.spike_count(), 1);

        // Refractory step never fires, window shorter than dt ends it
        assert!(n.process(0.01).is_none());
        assert_eq!(n.state(), NeuronState::Inactive);

        assert!(n.process(0.01).is_some());
        assert!((n.last_spike_ms().unwrap() - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_long_refractory_window_blocks_firing() {
        let n = Neuron::new(NeuronParams {
            threshold: 0.5,
            refractory_period: 0.05,
            decay_rate: 0.0,
            ..Default::default()
        });
        n.set_activation(1.0);
        assert!(n.process(0.01).is_some());
        for _ in 0..3 {
            assert!(n.process(0.01).is_none());
            assert_eq!(n.state(), NeuronState::Refractory);
        }
    }

    #[test]
    fn test_set_activation_clamps_and_rearms() {
        let n = Neuron::new(NeuronParams::default());
        n.set_activation(7.0);
        assert_eq!(n.activation(), 1.0);
        n.set_activation(-1.0);
        assert_eq!(n.activation(), 0.0);
        assert_eq!(n.state(), NeuronState::Inactive);
    }

    #[test]
    fn test_inhibitory_input_subtracts() {
        let exc = Neuron::new(NeuronParams::default());
        let inh = Neuron::new(NeuronParams::default());
        let post = Neuron::new(NeuronParams {
            decay_rate: 0.0,
            ..Default::default()
        });
        connect(&exc, &post, 0.4, SynapseType::Excitatory);
        connect(&inh, &post, 0.3, SynapseType::Inhibitory);
        connect(&inh, &post, 1.0, SynapseType::Modulatory);
        exc.set_activation(1.0);
        inh.set_activation(1.0);

        assert!((post.input_drive() - 0.1).abs() < 1e-6);
        post.process(0.01);
        assert!((post.activation() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_self_loop_does_not_deadlock() {
        let n = Neuron::new(NeuronParams::default());
        connect(&n, &n, 0.2, SynapseType::Excitatory);
        n.set_activation(0.3);
        n.process(0.01);
        assert!(n.activation() > 0.3);
    }

    #[test]
    fn test_duplicate_and_mismatch() {
        let a = Neuron::new(NeuronParams::default());
        let b = Neuron::new(NeuronParams::default());
        let s = connect(&a, &b, 0.5, SynapseType::Excitatory);

        assert_eq!(a.add_output_synapse(&s), Ok(false));
        assert!(matches!(
            a.add_input_synapse(&s),
            Err(NeuralError::EndpointMismatch { side: "target", .. })
        ));
        assert!(matches!(
            b.add_output_synapse(&s),
            Err(NeuralError::EndpointMismatch { side: "source", .. })
        ));
        assert_eq!(a.output_count(), 1);
        assert!(a.output_to(b.id()).is_some());

        assert!(b.remove_input_synapse(s.id()));
        assert!(!b.remove_input_synapse(s.id()));
    }

    #[test]
    fn test_attach_output_unique_reuses_edge() {
        let a = Neuron::new(NeuronParams::default());
        let b = Neuron::new(NeuronParams::default());
        let first = Synapse::new(&a, &b, 0.3, SynapseType::Excitatory, WeightBounds::default());
        let second = Synapse::new(&a, &b, 0.9, SynapseType::Excitatory, WeightBounds::default());

        let (kept, fresh) = a.attach_output_unique(&first).unwrap();
        assert!(fresh);
        assert_eq!(kept.id(), first.id());

        let (kept, fresh) = a.attach_output_unique(&second).unwrap();
        assert!(!fresh);
        assert_eq!(kept.id(), first.id());
        assert_eq!(a.output_count(), 1);

        first.retire();
        assert!(a.output_to(b.id()).is_none());
        assert!(b.attach_output_unique(&second).is_err());
    }

    #[test]
    fn test_retain_live_synapses() {
        let a = Neuron::new(NeuronParams::default());
        let b = Neuron::new(NeuronParams::default());
        connect(&a, &b, 0.5, SynapseType::Excitatory);
        drop(b);
        assert_eq!(a.retain_live_synapses(), 1);
        assert_eq!(a.output_count(), 0);
    }

    proptest! {
        #[test]
        fn activation_and_metabolism_stay_in_range(
            start in -2.0f32..2.0,
            drive_w in 0.0f32..1.0,
            dt in 0.0f32..1.0,
            energy in -1.0f32..2.0,
            health in -1.0f32..2.0,
        ) {
            let pre = Neuron::new(NeuronParams::default());
            let post = Neuron::new(NeuronParams::default());
            connect(&pre, &post, drive_w, SynapseType::Excitatory);
            pre.set_activation(1.0);
            post.set_activation(start);
            post.set_metabolic(energy, health);
            post.process(dt);

            let d = post.snapshot();
            prop_assert!((0.0..=1.0).contains(&d.activation));
            prop_assert!((0.0..=1.0).contains(&d.energy));
            prop_assert!((HEALTH_MIN..=1.0).contains(&d.mito_health));
        }
    }
}
