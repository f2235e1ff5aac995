// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Region
//!
//! A region owns a population of neurons, the parallel mitochondrial state
//! array and the connection table for every synapse touching it.
//!
//! ## Locking
//!
//! Three mutexes, always taken in this order when more than one is needed:
//!
//! 1. population (`region_mutex`): neuron list, mito array, id index
//! 2. a neuron's own mutex (taken inside `Neuron` methods)
//! 3. connections (`connection_mutex`)
//!
//! Cross-region wiring, pruning and neuron removal take the connection
//! mutexes of every linked region in ascending region-id order. Neither the
//! peer table nor the runtime mutex (clock, phase, seed, backend) is held
//! while any of the above is taken.
//!
//! ## Step order
//!
//! 1. neurons advance under the activation pattern (or the behavior override)
//! 2. mitochondrial update, batched above the accelerator threshold
//! 3. eligibility traces decay and accumulate on every touching synapse
//! 4. the specialisation hook runs

mod connections;
mod stats;
mod wiring;

pub use stats::{RegionStats, RegionStepReport};

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use hypergraph_config::RegionConfig;
use hypergraph_npu_neural::metabolism::STRESS_ENERGY;
use hypergraph_npu_neural::{
    MitoParams, MitoState, Neuron, NeuronId, NeuronParams, RegionId, Synapse, WeightBounds,
};
use hypergraph_observability::TelemetryHandle;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tracing::{debug, warn};

use crate::backend::{select_backend, BackendConfig, BackendType, BatchedBackend, MitoBackend, ScalarBackend};
use crate::behavior::RegionBehavior;
use crate::pattern::{self, ActivationPattern, PatternContext, RegionType};

use connections::Connections;

/// Neuromodulator bias added to every activation per unit level
pub const NEUROMODULATOR_BIAS: f32 = 0.05;

#[derive(Default)]
struct Population {
    neurons: Vec<Arc<Neuron>>,
    mito: Vec<MitoState>,
    index: AHashMap<NeuronId, usize>,
}

impl Population {
    fn push(&mut self, neuron: Arc<Neuron>) -> bool {
        if self.index.contains_key(&neuron.id()) {
            return false;
        }
        self.index.insert(neuron.id(), self.neurons.len());
        self.mito.push(MitoState {
            energy: neuron.energy(),
            health: neuron.health(),
        });
        self.neurons.push(neuron);
        true
    }

    fn remove(&mut self, id: NeuronId) -> Option<Arc<Neuron>> {
        let idx = self.index.remove(&id)?;
        let neuron = self.neurons.remove(idx);
        self.mito.remove(idx);
        for (i, n) in self.neurons.iter().enumerate().skip(idx) {
            self.index.insert(n.id(), i);
        }
        Some(neuron)
    }
}

struct Runtime {
    pattern: ActivationPattern,
    seed: u64,
    structural_rng: StdRng,
    /// Oscillator phase, seconds
    phase: f32,
    clock_ms: f64,
    exploration_noise: bool,
    backend_config: BackendConfig,
    accelerator: Arc<dyn MitoBackend>,
}

pub struct Region {
    this: Weak<Region>,
    id: RegionId,
    name: String,
    region_type: RegionType,
    config: RegionConfig,
    neuron_params: NeuronParams,
    bounds: WeightBounds,
    mito_params: MitoParams,

    population: Mutex<Population>,
    connections: Mutex<Connections>,
    /// Regions sharing at least one synapse with this one
    peers: Mutex<AHashMap<RegionId, Weak<Region>>>,
    runtime: Mutex<Runtime>,
    behavior: Mutex<Option<Box<dyn RegionBehavior>>>,
    telemetry: RwLock<TelemetryHandle>,

    active: AtomicBool,
    cycles: AtomicU64,
    spikes_total: AtomicU64,
    spikes_last_step: AtomicU64,
    accelerator_fallbacks: AtomicU64,
    /// f32 bits of the mean activation after the last step
    global_activation: AtomicU32,
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("region_type", &self.region_type)
            .field("neurons", &self.neuron_count())
            .field("active", &self.is_active())
            .finish()
    }
}

fn cycle_seed(seed: u64, cycle: u64) -> u64 {
    seed ^ cycle.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn structural_seed(seed: u64) -> u64 {
    seed ^ 0x5DEE_CE66_D1CE_4E5B
}

impl Region {
    /// Empty region; see [`crate::RegionBuilder`] for the usual entry point
    pub fn new(
        id: RegionId,
        name: impl Into<String>,
        region_type: RegionType,
        pattern: ActivationPattern,
        config: &RegionConfig,
    ) -> Arc<Self> {
        let seed = id.0;
        let neuron_params = NeuronParams {
            threshold: config.firing_threshold,
            decay_rate: config.decay_rate,
            refractory_period: config.refractory_period,
            ..Default::default()
        };
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            id,
            name: name.into(),
            region_type,
            config: config.clone(),
            neuron_params,
            bounds: WeightBounds::new(config.weight_min, config.weight_max)
                .with_max_step(config.max_weight_step),
            mito_params: MitoParams {
                production_rate: config.mito_production_rate,
                base_consumption: config.mito_base_consumption,
            },
            population: Mutex::new(Population::default()),
            connections: Mutex::new(Connections::default()),
            peers: Mutex::new(AHashMap::new()),
            runtime: Mutex::new(Runtime {
                pattern,
                seed,
                structural_rng: StdRng::seed_from_u64(structural_seed(seed)),
                phase: 0.0,
                clock_ms: 0.0,
                exploration_noise: config.exploration_noise,
                backend_config: BackendConfig {
                    batch_threshold: config.accelerator_threshold,
                    force_scalar: false,
                },
                accelerator: Arc::new(BatchedBackend::default()),
            }),
            behavior: Mutex::new(None),
            telemetry: RwLock::new(TelemetryHandle::disabled()),
            active: AtomicBool::new(true),
            cycles: AtomicU64::new(0),
            spikes_total: AtomicU64::new(0),
            spikes_last_step: AtomicU64::new(0),
            accelerator_fallbacks: AtomicU64::new(0),
            global_activation: AtomicU32::new(0.0f32.to_bits()),
        })
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region_type(&self) -> RegionType {
        self.region_type
    }

    pub fn config(&self) -> &RegionConfig {
        &self.config
    }

    pub fn neuron_params(&self) -> NeuronParams {
        self.neuron_params
    }

    pub fn bounds(&self) -> WeightBounds {
        self.bounds
    }

    pub fn pattern(&self) -> ActivationPattern {
        self.runtime.lock().pattern
    }

    pub fn set_pattern(&self, pattern: ActivationPattern) {
        self.runtime.lock().pattern = pattern;
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Inactive regions skip `process` entirely
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    pub fn processing_cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Mean activation after the last step
    pub fn global_activation(&self) -> f32 {
        f32::from_bits(self.global_activation.load(Ordering::Relaxed))
    }

    /// Region clock in milliseconds
    pub fn clock_ms(&self) -> f64 {
        self.runtime.lock().clock_ms
    }

    pub fn phase(&self) -> f32 {
        self.runtime.lock().phase
    }

    /// Reseed exploration noise and structural sampling
    pub fn set_random_seed(&self, seed: u64) {
        let mut rt = self.runtime.lock();
        rt.seed = seed;
        rt.structural_rng = StdRng::seed_from_u64(structural_seed(seed));
    }

    pub fn set_exploration_noise(&self, enabled: bool) {
        self.runtime.lock().exploration_noise = enabled;
    }

    /// Replace the accelerated metabolic backend
    pub fn set_accelerator(&self, backend: Arc<dyn MitoBackend>) {
        self.runtime.lock().accelerator = backend;
    }

    pub fn set_backend_config(&self, config: BackendConfig) {
        self.runtime.lock().backend_config = config;
    }

    pub fn set_telemetry(&self, telemetry: TelemetryHandle) {
        *self.telemetry.write() = telemetry;
    }

    pub fn accelerator_fallbacks(&self) -> u64 {
        self.accelerator_fallbacks.load(Ordering::Relaxed)
    }

    // ---------------------------------------------------------------------
    // Specialisation
    // ---------------------------------------------------------------------

    /// Attach a behavior; `configure` runs before it is installed
    pub fn set_behavior(&self, mut behavior: Box<dyn RegionBehavior>) {
        behavior.configure(self);
        *self.behavior.lock() = Some(behavior);
    }

    pub fn behavior_kind(&self) -> Option<&'static str> {
        self.behavior.lock().as_ref().map(|b| b.kind())
    }

    /// Run `f` against the attached behavior
    pub fn with_behavior<R>(&self, f: impl FnOnce(&mut dyn RegionBehavior) -> R) -> Option<R> {
        let mut guard = self.behavior.lock();
        guard.as_deref_mut().map(|b| f(b))
    }

    // ---------------------------------------------------------------------
    // Population
    // ---------------------------------------------------------------------

    pub fn neuron_count(&self) -> usize {
        self.population.lock().neurons.len()
    }

    /// Snapshot of the neuron list in insertion order
    pub fn neurons(&self) -> Vec<Arc<Neuron>> {
        self.population.lock().neurons.clone()
    }

    pub fn neuron_ids(&self) -> Vec<NeuronId> {
        self.population.lock().neurons.iter().map(|n| n.id()).collect()
    }

    pub fn neuron(&self, id: NeuronId) -> Option<Arc<Neuron>> {
        let pop = self.population.lock();
        pop.index.get(&id).map(|&i| Arc::clone(&pop.neurons[i]))
    }

    pub fn neuron_at(&self, index: usize) -> Option<Arc<Neuron>> {
        self.population.lock().neurons.get(index).cloned()
    }

    pub fn contains_neuron(&self, id: NeuronId) -> bool {
        self.population.lock().index.contains_key(&id)
    }

    /// Adopt an existing neuron; `false` if it is already a member
    pub fn add_neuron(&self, neuron: Arc<Neuron>) -> bool {
        self.population.lock().push(neuron)
    }

    /// Create `count` neurons with this region's parameters
    pub fn create_neurons(&self, count: usize) -> Vec<Arc<Neuron>> {
        let created: Vec<Arc<Neuron>> = (0..count).map(|_| Neuron::new(self.neuron_params)).collect();
        let mut pop = self.population.lock();
        for neuron in &created {
            pop.push(Arc::clone(neuron));
        }
        created
    }

    /// Create `count` neurons if mean mitochondrial energy reaches `energy_gate`
    pub fn spawn_neurons(&self, count: usize, energy_gate: f32) -> Vec<Arc<Neuron>> {
        let gate = if energy_gate.is_nan() {
            1.0
        } else {
            energy_gate.clamp(0.0, 1.0)
        };
        let energy = self.average_energy();
        if count == 0 || energy < gate {
            debug!(target: "region", region = %self.name, energy, gate, "spawn gated");
            return Vec::new();
        }
        let spawned = self.create_neurons(count);
        debug!(target: "region", region = %self.name, count = spawned.len(), energy, "spawned neurons");
        spawned
    }

    // ---------------------------------------------------------------------
    // Metabolism
    // ---------------------------------------------------------------------

    /// Mean mitochondrial energy; 0 for an empty region
    pub fn average_energy(&self) -> f32 {
        let pop = self.population.lock();
        if pop.mito.is_empty() {
            return 0.0;
        }
        pop.mito.iter().map(|m| m.energy).sum::<f32>() / pop.mito.len() as f32
    }

    pub fn average_health(&self) -> f32 {
        let pop = self.population.lock();
        if pop.mito.is_empty() {
            return 0.0;
        }
        pop.mito.iter().map(|m| m.health).sum::<f32>() / pop.mito.len() as f32
    }

    /// Fraction of neurons with energy below the stress level
    pub fn metabolic_stress(&self) -> f32 {
        let pop = self.population.lock();
        if pop.mito.is_empty() {
            return 0.0;
        }
        let stressed = pop.mito.iter().filter(|m| m.energy < STRESS_ENERGY).count();
        stressed as f32 / pop.mito.len() as f32
    }

    pub fn mito_states(&self) -> Vec<MitoState> {
        self.population.lock().mito.clone()
    }

    /// Overwrite one member's energy and health, keeping the mito list in step
    pub fn set_neuron_metabolic(&self, id: NeuronId, energy: f32, health: f32) -> bool {
        let mut pop = self.population.lock();
        let Some(&i) = pop.index.get(&id) else {
            return false;
        };
        let neuron = Arc::clone(&pop.neurons[i]);
        neuron.set_metabolic(energy, health);
        pop.mito[i] = MitoState {
            energy: neuron.energy(),
            health: neuron.health(),
        };
        true
    }

    // ---------------------------------------------------------------------
    // Step
    // ---------------------------------------------------------------------

    /// Advance the region by `dt` seconds
    pub fn process(&self, dt: f32) -> RegionStepReport {
        if !self.is_active() {
            return RegionStepReport::idle(self.id, self.processing_cycles());
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let neurons = self.neurons();

        let (pattern, now_ms, phase, mut rng, accelerator, backend_config) = {
            let mut rt = self.runtime.lock();
            rt.clock_ms += dt as f64 * 1000.0;
            rt.phase += dt;
            let rng = rt
                .exploration_noise
                .then(|| StdRng::seed_from_u64(cycle_seed(rt.seed, cycle)));
            (
                rt.pattern,
                rt.clock_ms,
                rt.phase,
                rng,
                Arc::clone(&rt.accelerator),
                rt.backend_config.clone(),
            )
        };

        let overridden = {
            let mut guard = self.behavior.lock();
            guard
                .as_deref_mut()
                .and_then(|b| b.advance_neurons(self, &neurons, dt, now_ms))
        };
        let spikes = match overridden {
            Some(spikes) => spikes,
            None => pattern::advance(
                pattern,
                &neurons,
                PatternContext {
                    dt,
                    now_ms,
                    phase,
                    rng: rng.as_mut(),
                },
            ),
        };

        self.update_metabolism(&neurons, accelerator.as_ref(), &backend_config, cycle);
        self.update_eligibility(dt);

        if let Some(behavior) = self.behavior.lock().as_deref_mut() {
            behavior.per_step_hook(self, &neurons, dt);
        }

        let mean = if neurons.is_empty() {
            0.0
        } else {
            neurons.iter().map(|n| n.activation()).sum::<f32>() / neurons.len() as f32
        };
        self.global_activation.store(mean.to_bits(), Ordering::Relaxed);
        self.spikes_total
            .fetch_add(spikes.len() as u64, Ordering::Relaxed);
        self.spikes_last_step
            .store(spikes.len() as u64, Ordering::Relaxed);

        RegionStepReport {
            region_id: self.id,
            cycle,
            spikes,
            mean_activation: mean,
        }
    }

    fn update_metabolism(
        &self,
        neurons: &[Arc<Neuron>],
        accelerator: &dyn MitoBackend,
        backend_config: &BackendConfig,
        cycle: u64,
    ) {
        if neurons.is_empty() {
            return;
        }
        let activity: Vec<f32> = neurons.iter().map(|n| n.activation()).collect();
        let (mut energy, mut health): (Vec<f32>, Vec<f32>) = {
            let pop = self.population.lock();
            neurons
                .iter()
                .map(|n| match pop.index.get(&n.id()) {
                    Some(&i) => (pop.mito[i].energy, pop.mito[i].health),
                    None => (n.energy(), n.health()),
                })
                .unzip()
        };

        let decision = select_backend(neurons.len(), backend_config);
        let result = match decision.backend_type {
            BackendType::Batched => {
                let (e0, h0) = (energy.clone(), health.clone());
                match accelerator.step(&mut energy, &mut health, &activity, &self.mito_params) {
                    Ok(()) => Ok(()),
                    Err(err) => {
                        self.accelerator_fallbacks.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            target: "region",
                            region = %self.name,
                            backend = accelerator.backend_name(),
                            error = %err,
                            "accelerated metabolism failed, falling back to scalar"
                        );
                        self.telemetry.read().emit(
                            "accelerator_fallback",
                            cycle,
                            json!({
                                "region": self.name,
                                "region_id": self.id.0,
                                "backend": accelerator.backend_name(),
                                "neurons": neurons.len(),
                                "error": err.to_string(),
                            }),
                        );
                        energy = e0;
                        health = h0;
                        ScalarBackend.step(&mut energy, &mut health, &activity, &self.mito_params)
                    }
                }
            }
            _ => ScalarBackend.step(&mut energy, &mut health, &activity, &self.mito_params),
        };
        if let Err(err) = result {
            warn!(target: "region", region = %self.name, error = %err, "metabolism skipped");
            return;
        }

        let mut pop = self.population.lock();
        for (k, neuron) in neurons.iter().enumerate() {
            if let Some(&i) = pop.index.get(&neuron.id()) {
                pop.mito[i] = MitoState {
                    energy: energy[k],
                    health: health[k],
                };
            }
            neuron.set_metabolic(energy[k], health[k]);
        }
    }

    fn update_eligibility(&self, dt: f32) {
        for synapse in self.all_synapses() {
            if synapse.is_modulatory() {
                continue;
            }
            let Some((pre, post)) = synapse.endpoints() else {
                continue;
            };
            synapse.decay_eligibility(1.0, dt);
            synapse.accumulate_eligibility(pre.activation(), post.activation(), dt);
        }
    }

    // ---------------------------------------------------------------------
    // External I/O
    // ---------------------------------------------------------------------

    /// Set activations from `values` in neuron order; returns how many were set
    pub fn feed_external_pattern(&self, values: &[f32]) -> usize {
        let neurons = self.neurons();
        let n = values.len().min(neurons.len());
        for (neuron, &v) in neurons.iter().zip(values) {
            neuron.set_activation(v);
        }
        n
    }

    /// Activations in neuron order, written into `out`
    pub fn readout_vector(&self, out: &mut Vec<f32>) {
        out.clear();
        let pop = self.population.lock();
        out.extend(pop.neurons.iter().map(|n| n.activation()));
    }

    pub fn readout(&self) -> Vec<f32> {
        let mut out = Vec::new();
        self.readout_vector(&mut out);
        out
    }

    /// Bias activations by `level · 0.05` and nudge eligible weights
    ///
    /// The weight part applies `Δw = η · level · e` to every synapse whose
    /// target lives here, so a cross-region edge is modulated once.
    pub fn apply_neuromodulator(&self, level: f32) {
        let level = if level.is_finite() { level.clamp(-1.0, 1.0) } else { 0.0 };
        if level == 0.0 {
            return;
        }
        for neuron in self.neurons() {
            neuron.modify_activation(|a| a + level * NEUROMODULATOR_BIAS);
        }

        let eta = self.config.neuromod_eta;
        if eta <= 0.0 || !eta.is_finite() {
            return;
        }
        let synapses = self.connections.lock().postsynaptic();
        for synapse in synapses {
            if synapse.is_modulatory() || !synapse.is_alive() {
                continue;
            }
            let e = synapse.eligibility();
            if e > 0.0 {
                synapse.apply_delta(eta * level * e);
            }
        }
    }

    /// Clear activations, states, traces and phase; topology is kept
    pub fn reset(&self) {
        for neuron in self.neurons() {
            neuron.reset();
        }
        for synapse in self.all_synapses() {
            synapse.clear_eligibility();
        }
        self.runtime.lock().phase = 0.0;
        self.global_activation.store(0.0f32.to_bits(), Ordering::Relaxed);
        if let Some(behavior) = self.behavior.lock().as_deref_mut() {
            behavior.reset();
        }
    }

    // ---------------------------------------------------------------------
    // Connection queries
    // ---------------------------------------------------------------------

    /// Every synapse touching this region, each once
    pub fn all_synapses(&self) -> Vec<Arc<Synapse>> {
        self.connections.lock().unique()
    }

    pub fn internal_synapses(&self) -> Vec<Arc<Synapse>> {
        self.connections.lock().internal.clone()
    }

    /// Incoming cross-region synapses targeting `neuron`
    pub fn input_connections(&self, neuron: NeuronId) -> Vec<Arc<Synapse>> {
        self.connections
            .lock()
            .inputs
            .get(&neuron)
            .cloned()
            .unwrap_or_default()
    }

    /// Outgoing cross-region synapses leaving `neuron`
    pub fn output_connections(&self, neuron: NeuronId) -> Vec<Arc<Synapse>> {
        self.connections
            .lock()
            .outputs
            .get(&neuron)
            .cloned()
            .unwrap_or_default()
    }

    /// Synapses this region created toward `peer`
    pub fn connections_to(&self, peer: RegionId) -> Vec<Arc<Synapse>> {
        let conns = self.connections.lock();
        let Some(ids) = conns.inter_region.get(&peer) else {
            return Vec::new();
        };
        conns
            .outputs
            .values()
            .flatten()
            .filter(|s| ids.contains(&s.id()))
            .cloned()
            .collect()
    }

    pub fn peer_regions(&self) -> Vec<RegionId> {
        let mut peers: Vec<RegionId> = self.connections.lock().inter_region.keys().copied().collect();
        peers.sort();
        peers
    }

    pub fn synapse_count(&self) -> usize {
        self.connections.lock().unique().len()
    }

    /// Structural self-check
    ///
    /// Verifies the mito array tracks the population, that no synapse appears
    /// twice in one list, and that every map entry is keyed by a member
    /// endpoint. Returns the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        let (members, mito_len) = {
            let pop = self.population.lock();
            if pop.index.len() != pop.neurons.len() {
                return Err(format!(
                    "index has {} entries for {} neurons",
                    pop.index.len(),
                    pop.neurons.len()
                ));
            }
            (pop.index.clone(), pop.mito.len())
        };
        if mito_len != members.len() {
            return Err(format!("{} mito states for {} neurons", mito_len, members.len()));
        }

        let conns = self.connections.lock();
        let mut seen = ahash::AHashSet::new();
        for s in &conns.internal {
            if !seen.insert(s.id()) {
                return Err(format!("{} listed twice as internal", s.id()));
            }
            if !s.is_retired()
                && (!members.contains_key(&s.source_id()) || !members.contains_key(&s.target_id()))
            {
                return Err(format!("internal {} has a foreign endpoint", s.id()));
            }
        }
        for (key, list) in &conns.inputs {
            for s in list {
                if s.target_id() != *key || (!s.is_retired() && !members.contains_key(key)) {
                    return Err(format!("input {} filed under {}", s.id(), key));
                }
                if !seen.insert(s.id()) {
                    return Err(format!("{} listed twice", s.id()));
                }
            }
        }
        for (key, list) in &conns.outputs {
            for s in list {
                if s.source_id() != *key || (!s.is_retired() && !members.contains_key(key)) {
                    return Err(format!("output {} filed under {}", s.id(), key));
                }
                if !seen.insert(s.id()) {
                    return Err(format!("{} listed twice", s.id()));
                }
            }
        }
        Ok(())
    }
}
