// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Synapses
//!
//! A synapse holds weak references to its endpoints. Once either endpoint is
//! dropped, or the synapse is retired by a region, it is inert: weight
//! updates and eligibility accumulation become no-ops.

pub mod stdp;
pub mod weight;

pub use stdp::{compute_stdp_batch, compute_stdp_weight_change, StdpKernel, STDP_TAU_MS};
pub use weight::{apply_weight_change, apply_weight_changes_batch, WeightBounds};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::neuron::Neuron;
use crate::types::{NeuronId, SynapseId};

/// Synapse type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SynapseType {
    Excitatory,
    Inhibitory,
    /// Gates neuromodulation only; never takes part in weight plasticity
    Modulatory,
}

impl SynapseType {
    /// Sign applied to `w · pre` when integrating input
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            SynapseType::Excitatory => 1.0,
            SynapseType::Inhibitory => -1.0,
            SynapseType::Modulatory => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlasticityRule {
    None,
    #[default]
    Hebbian,
    Stdp,
    Homeostatic,
}

/// Postsynaptic activity the homeostatic rule pulls toward
pub const HOMEOSTATIC_TARGET: f32 = 0.1;

/// Mutable part of a synapse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynapseState {
    pub weight: f32,
    pub learning_rate: f32,
    pub eligibility: f32,
    pub rule: PlasticityRule,
}

pub struct Synapse {
    id: SynapseId,
    source: Weak<Neuron>,
    target: Weak<Neuron>,
    source_id: NeuronId,
    target_id: NeuronId,
    kind: SynapseType,
    bounds: WeightBounds,
    retired: AtomicBool,
    state: Mutex<SynapseState>,
}

impl fmt::Debug for Synapse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Synapse")
            .field("id", &self.id)
            .field("source", &self.source_id)
            .field("target", &self.target_id)
            .field("kind", &self.kind)
            .field("weight", &state.weight)
            .field("eligibility", &state.eligibility)
            .finish()
    }
}

impl Synapse {
    pub const DEFAULT_LEARNING_RATE: f32 = 0.01;

    /// Create a synapse; the weight is clamped into `bounds`.
    ///
    /// The synapse is not attached to either neuron; callers do that through
    /// [`Neuron::add_output_synapse`] / [`Neuron::add_input_synapse`].
    pub fn new(
        source: &Arc<Neuron>,
        target: &Arc<Neuron>,
        weight: f32,
        kind: SynapseType,
        bounds: WeightBounds,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: SynapseId::next(),
            source: Arc::downgrade(source),
            target: Arc::downgrade(target),
            source_id: source.id(),
            target_id: target.id(),
            kind,
            bounds,
            retired: AtomicBool::new(false),
            state: Mutex::new(SynapseState {
                weight: bounds.clamp(weight),
                learning_rate: Self::DEFAULT_LEARNING_RATE,
                eligibility: 0.0,
                rule: PlasticityRule::default(),
            }),
        })
    }

    #[inline]
    pub fn id(&self) -> SynapseId {
        self.id
    }

    #[inline]
    pub fn source_id(&self) -> NeuronId {
        self.source_id
    }

    #[inline]
    pub fn target_id(&self) -> NeuronId {
        self.target_id
    }

    #[inline]
    pub fn kind(&self) -> SynapseType {
        self.kind
    }

    #[inline]
    pub fn is_modulatory(&self) -> bool {
        self.kind == SynapseType::Modulatory
    }

    pub fn bounds(&self) -> WeightBounds {
        self.bounds
    }

    pub fn source(&self) -> Option<Arc<Neuron>> {
        self.source.upgrade()
    }

    pub fn target(&self) -> Option<Arc<Neuron>> {
        self.target.upgrade()
    }

    /// Not retired and both endpoints still resolve
    pub fn is_alive(&self) -> bool {
        !self.is_retired() && self.source.strong_count() > 0 && self.target.strong_count() > 0
    }

    /// Mark as removed from the graph; irreversible
    pub fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    pub fn endpoints(&self) -> Option<(Arc<Neuron>, Arc<Neuron>)> {
        Some((self.source.upgrade()?, self.target.upgrade()?))
    }

    pub fn snapshot(&self) -> SynapseState {
        *self.state.lock()
    }

    pub fn weight(&self) -> f32 {
        self.state.lock().weight
    }

    pub fn set_weight(&self, weight: f32) {
        self.state.lock().weight = self.bounds.clamp(weight);
    }

    pub fn learning_rate(&self) -> f32 {
        self.state.lock().learning_rate
    }

    pub fn set_learning_rate(&self, lr: f32) {
        self.state.lock().learning_rate = if lr.is_finite() { lr.max(0.0) } else { 0.0 };
    }

    pub fn rule(&self) -> PlasticityRule {
        self.state.lock().rule
    }

    pub fn set_rule(&self, rule: PlasticityRule) {
        self.state.lock().rule = rule;
    }

    pub fn eligibility(&self) -> f32 {
        self.state.lock().eligibility
    }

    pub fn set_eligibility(&self, value: f32) {
        self.state.lock().eligibility = if value.is_finite() { value.max(0.0) } else { 0.0 };
    }

    pub fn clear_eligibility(&self) {
        self.state.lock().eligibility = 0.0;
    }

    /// Largest part of `delta` that keeps the weight legal
    pub fn apply_safety_guardrails(&self, delta: f32) -> f32 {
        let weight = self.state.lock().weight;
        self.bounds.guard_delta(weight, delta)
    }

    /// Apply a guarded weight change and return the change actually made
    pub fn apply_delta(&self, delta: f32) -> f32 {
        let mut state = self.state.lock();
        let before = state.weight;
        state.weight = apply_weight_change(before, delta, &self.bounds);
        state.weight - before
    }

    /// Apply this synapse's own plasticity rule
    ///
    /// For `Hebbian` and `Homeostatic`, `pre`/`post` are activations. For
    /// `Stdp` they are spike times in milliseconds. Returns the applied Δw.
    pub fn update_weight(&self, pre: f32, post: f32, dt: f32) -> f32 {
        if self.is_modulatory() || !self.is_alive() {
            return 0.0;
        }
        let SynapseState {
            learning_rate, rule, ..
        } = self.snapshot();

        let delta = match rule {
            PlasticityRule::None => return 0.0,
            PlasticityRule::Hebbian => learning_rate * pre * post * dt,
            PlasticityRule::Stdp => compute_stdp_weight_change(
                post - pre,
                &StdpKernel {
                    eta: learning_rate,
                    tau_ms: STDP_TAU_MS,
                },
            ),
            PlasticityRule::Homeostatic => learning_rate * pre * (HOMEOSTATIC_TARGET - post) * dt,
        };
        self.apply_delta(delta)
    }

    /// `e += pre · post · dt`
    pub fn accumulate_eligibility(&self, pre: f32, post: f32, dt: f32) {
        if self.is_modulatory() || !self.is_alive() {
            return;
        }
        let increment = pre * post * dt;
        if increment.is_finite() && increment > 0.0 {
            self.state.lock().eligibility += increment;
        }
    }

    /// `e *= exp(−rate · dt)`
    pub fn decay_eligibility(&self, rate: f32, dt: f32) {
        let factor = (-rate.max(0.0) * dt.max(0.0)).exp();
        self.state.lock().eligibility *= factor;
    }

    /// Add to the trace without pushing it past 1.0
    pub fn bump_eligibility(&self, amount: f32) {
        if self.is_modulatory() || !amount.is_finite() || amount <= 0.0 {
            return;
        }
        let mut state = self.state.lock();
        if state.eligibility < 1.0 {
            state.eligibility = (state.eligibility + amount).min(1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neuron::{Neuron, NeuronParams};

    fn pair() -> (Arc<Neuron>, Arc<Neuron>) {
        (
            Neuron::new(NeuronParams::default()),
            Neuron::new(NeuronParams::default()),
        )
    }

    #[test]
    fn test_weight_clamped_on_creation() {
        let (a, b) = pair();
        let s = Synapse::new(&a, &b, 3.0, SynapseType::Excitatory, WeightBounds::default());
        assert_eq!(s.weight(), 1.0);
    }

    #[test]
    fn test_hebbian_rule() {
        let (a, b) = pair();
        let s = Synapse::new(&a, &b, 0.5, SynapseType::Excitatory, WeightBounds::default());
        s.set_learning_rate(0.1);
        let applied = s.update_weight(1.0, 1.0, 0.016);
        assert!((applied - 0.0016).abs() < 1e-7);
        assert!((s.weight() - 0.5016).abs() < 1e-6);
    }

    #[test]
    fn test_stdp_rule_uses_spike_times() {
        let (a, b) = pair();
        let s = Synapse::new(&a, &b, 0.5, SynapseType::Excitatory, WeightBounds::default());
        s.set_rule(PlasticityRule::Stdp);
        assert!(s.update_weight(0.0, 5.0, 0.016) > 0.0);
        assert!(s.update_weight(5.0, 0.0, 0.016) < 0.0);
    }

    #[test]
    fn test_modulatory_is_inert() {
        let (a, b) = pair();
        let s = Synapse::new(&a, &b, 0.5, SynapseType::Modulatory, WeightBounds::default());
        assert_eq!(s.update_weight(1.0, 1.0, 1.0), 0.0);
        s.accumulate_eligibility(1.0, 1.0, 1.0);
        s.bump_eligibility(0.5);
        assert_eq!(s.eligibility(), 0.0);
        assert_eq!(s.weight(), 0.5);
    }

    #[test]
    fn test_dead_endpoint_is_inert() {
        let (a, b) = pair();
        let s = Synapse::new(&a, &b, 0.5, SynapseType::Excitatory, WeightBounds::default());
        drop(b);
        assert!(!s.is_alive());
        assert!(s.endpoints().is_none());
        assert_eq!(s.update_weight(1.0, 1.0, 1.0), 0.0);
        s.accumulate_eligibility(1.0, 1.0, 1.0);
        assert_eq!(s.eligibility(), 0.0);
    }

    #[test]
    fn test_retired_is_inert() {
        let (a, b) = pair();
        let s = Synapse::new(&a, &b, 0.5, SynapseType::Excitatory, WeightBounds::default());
        s.retire();
        assert!(!s.is_alive());
        assert_eq!(s.update_weight(1.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn test_eligibility_decay_and_cap() {
        let (a, b) = pair();
        let s = Synapse::new(&a, &b, 0.5, SynapseType::Excitatory, WeightBounds::default());
        s.accumulate_eligibility(1.0, 0.5, 0.1);
        assert!((s.eligibility() - 0.05).abs() < 1e-7);

        s.decay_eligibility(1.0, 1.0);
        assert!((s.eligibility() - 0.05 * (-1.0f32).exp()).abs() < 1e-7);

        for _ in 0..20 {
            s.bump_eligibility(0.1);
        }
        assert_eq!(s.eligibility(), 1.0);
    }

    #[test]
    fn test_guardrails_respect_bounds() {
        let (a, b) = pair();
        let bounds = WeightBounds::default().with_max_step(Some(0.1));
        let s = Synapse::new(&a, &b, 0.95, SynapseType::Inhibitory, bounds);
        assert!((s.apply_safety_guardrails(0.5) - 0.05).abs() < 1e-6);
        assert!((s.apply_safety_guardrails(-0.5) + 0.1).abs() < 1e-6);
        // guardrails are advisory; weight unchanged
        assert_eq!(s.weight(), 0.95);
    }
}
