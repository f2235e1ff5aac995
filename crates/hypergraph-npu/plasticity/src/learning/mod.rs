// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Learning system
//!
//! [`LearningSystem::update_learning`] runs once per brain step, after every
//! region has processed. It applies, in order:
//!
//! 1. attention anneal
//! 2. Hebbian updates (plus homeostasis when enabled)
//! 3. STDP on neurons that spiked this step
//! 4. the pending external reward, consumed atomically
//! 5. weight-decay consolidation, on its own wall-clock interval
//! 6. structural plasticity, every `interval_steps` steps
//!
//! Locking: `syn_state` and `spike_times` never nest. Neither is held while
//! calling into a region.

mod attention;
mod consolidation;
mod hebbian;
mod reward;
mod stdp;
mod structural;

pub use reward::REWARD_LIMIT;
pub use stdp::STDP_BATCH_THRESHOLD;
pub use structural::StructuralReport;

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ahash::{AHashMap, AHashSet};
use hypergraph_config::{CompetenceMode, LearningConfig};
use hypergraph_npu_neural::{Neuron, NeuronId, SpikeEvent, Synapse, SynapseId};
use hypergraph_npu_region_engine::Region;
use hypergraph_observability::TelemetryHandle;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::developmental::{DevelopmentalModulator, LearningKind};
use crate::intrinsic::IntrinsicMotivation;
use crate::stats::LearningStats;

/// Trace added to every synapse of a spiking neuron under auto-eligibility
pub const AUTO_ELIGIBILITY_BUMP: f32 = 0.1;

const DEFAULT_SEED: u64 = 0x4C45_4152_4E00;
const INITIAL_COMPETENCE: f32 = 0.5;

/// Eligibility, attention and reward-shaping state
#[derive(Debug, Default)]
struct SynapticState {
    attention_map: AHashMap<NeuronId, f32>,
    /// Boost the anneal decays from; also the ExternalMap boost
    attention_target: f32,
    anneal_remaining_ms: f32,
    obs_ema: Vec<f32>,
    sub_ema: Vec<f32>,
    mimicry: f32,
    /// Synapses seen in the last step; used by shutdown
    known_synapses: Vec<Weak<Synapse>>,
}

#[derive(Debug, Default)]
struct SpikeTimes {
    last: AHashMap<NeuronId, f64>,
    /// Neurons that spiked since the previous `update_learning`
    fresh: AHashSet<NeuronId>,
}

#[derive(Debug, Default)]
struct Schedule {
    consolidation_elapsed: f32,
    structural_cursor: usize,
}

/// One region's deduplicated synapses for this step
pub(crate) struct RegionSynapses {
    pub region: Arc<Region>,
    pub synapses: Vec<Arc<Synapse>>,
}

pub struct LearningSystem {
    config: RwLock<LearningConfig>,
    active: AtomicBool,
    /// f32 bits
    pending_reward: AtomicU32,
    /// f32 bits, EMA in [0, 1]
    competence: AtomicU32,
    step: AtomicU64,
    syn_state: Mutex<SynapticState>,
    spike_times: Mutex<SpikeTimes>,
    schedule: Mutex<Schedule>,
    rng: Mutex<StdRng>,
    stats: Mutex<LearningStats>,
    intrinsic: Mutex<IntrinsicMotivation>,
    developmental: RwLock<Option<Arc<dyn DevelopmentalModulator>>>,
    telemetry: RwLock<TelemetryHandle>,
}

impl std::fmt::Debug for LearningSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearningSystem")
            .field("active", &self.is_active())
            .field("step", &self.step.load(Ordering::Relaxed))
            .field("pending_reward", &self.pending_reward())
            .field("competence", &self.competence())
            .finish()
    }
}

impl Default for LearningSystem {
    fn default() -> Self {
        Self::new(LearningConfig::default())
    }
}

impl LearningSystem {
    /// New, active learning system; out-of-range config values are clamped
    pub fn new(config: LearningConfig) -> Self {
        let config = config.sanitized();
        let boost = config.attention.attention_boost_factor;
        let anneal = config.attention.anneal_ms;
        let intrinsic = IntrinsicMotivation::new(config.intrinsic.clone());
        Self {
            config: RwLock::new(config),
            active: AtomicBool::new(true),
            pending_reward: AtomicU32::new(0.0f32.to_bits()),
            competence: AtomicU32::new(INITIAL_COMPETENCE.to_bits()),
            step: AtomicU64::new(0),
            syn_state: Mutex::new(SynapticState {
                attention_target: boost,
                anneal_remaining_ms: anneal,
                ..Default::default()
            }),
            spike_times: Mutex::new(SpikeTimes::default()),
            schedule: Mutex::new(Schedule::default()),
            rng: Mutex::new(StdRng::seed_from_u64(DEFAULT_SEED)),
            stats: Mutex::new(LearningStats::default()),
            intrinsic: Mutex::new(intrinsic),
            developmental: RwLock::new(None),
            telemetry: RwLock::new(TelemetryHandle::disabled()),
        }
    }

    pub fn config(&self) -> LearningConfig {
        self.config.read().clone()
    }

    /// Replace the configuration; values are clamped into range
    pub fn set_config(&self, config: LearningConfig) {
        let config = config.sanitized();
        self.intrinsic.lock().set_config(config.intrinsic.clone());
        *self.config.write() = config;
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Reactivate after [`LearningSystem::shutdown`]
    pub fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    pub fn set_random_seed(&self, seed: u64) {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
    }

    pub fn set_developmental_modulator(&self, modulator: Option<Arc<dyn DevelopmentalModulator>>) {
        *self.developmental.write() = modulator;
    }

    pub fn set_telemetry(&self, telemetry: TelemetryHandle) {
        *self.telemetry.write() = telemetry;
    }

    pub fn steps(&self) -> u64 {
        self.step.load(Ordering::Relaxed)
    }

    pub fn competence(&self) -> f32 {
        f32::from_bits(self.competence.load(Ordering::Acquire))
    }

    pub fn pending_reward(&self) -> f32 {
        f32::from_bits(self.pending_reward.load(Ordering::Acquire))
    }

    /// Current counters plus live atomics
    pub fn stats(&self) -> LearningStats {
        let mut stats = self.stats.lock().clone();
        stats.steps = self.steps();
        stats.is_active = self.is_active();
        stats.pending_reward = self.pending_reward();
        stats.competence = self.competence();
        stats.attention_boost = self.current_attention_boost();
        stats
    }

    // ------------------------------------------------------------------
    // Spikes
    // ------------------------------------------------------------------

    /// Remember a spike for this step's STDP pass
    pub fn record_spike(&self, spike: &SpikeEvent) {
        if !spike.time_ms.is_finite() {
            return;
        }
        let mut times = self.spike_times.lock();
        times.last.insert(spike.neuron_id, spike.time_ms);
        times.fresh.insert(spike.neuron_id);
    }

    /// Bump traces around a spiking neuron when auto-eligibility is on
    pub fn on_neuron_spike(&self, neuron: &Neuron) {
        if !self.is_active() || !self.config.read().reward.auto_eligibility {
            return;
        }
        for synapse in neuron
            .input_synapses()
            .iter()
            .chain(neuron.output_synapses().iter())
        {
            if synapse.is_alive() {
                synapse.bump_eligibility(AUTO_ELIGIBILITY_BUMP);
            }
        }
    }

    pub fn last_spike_ms(&self, neuron: NeuronId) -> Option<f64> {
        self.spike_times.lock().last.get(&neuron).copied()
    }

    // ------------------------------------------------------------------
    // Step
    // ------------------------------------------------------------------

    /// Run one learning step over `regions`; `dt` in seconds
    pub fn update_learning(&self, dt: f32, regions: &[Arc<Region>]) {
        if !self.is_active() {
            return;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let step = self.step.fetch_add(1, Ordering::AcqRel) + 1;
        let config = self.config();

        self.anneal_attention(dt);

        let cached = self.cache_synapses(regions);
        {
            let mut stats = self.stats.lock();
            stats.regions_tracked = regions.len();
            stats.synapses_tracked = cached.iter().map(|r| r.synapses.len()).sum();
        }

        if config.hebbian_rate > 0.0 {
            self.apply_hebbian(dt, &config, &cached);
        }
        if config.stdp_rate > 0.0 {
            self.apply_stdp(&config, &cached);
        }

        let reward = f32::from_bits(self.pending_reward.swap(0.0f32.to_bits(), Ordering::AcqRel));
        if reward != 0.0 && reward.is_finite() {
            self.apply_reward(reward, &config, &cached);
        }

        self.maybe_consolidate(dt, &config, &cached);

        if config.structural.enabled && step % config.structural.interval_steps.max(1) == 0 {
            self.run_structural_cycle(&config, regions);
        }

        self.spike_times.lock().fresh.clear();
    }

    /// Every live synapse touching each region, each listed once overall
    ///
    /// A cross-region synapse belongs to the first region that lists it.
    fn cache_synapses(&self, regions: &[Arc<Region>]) -> Vec<RegionSynapses> {
        let mut seen: AHashSet<SynapseId> = AHashSet::new();
        let mut known = Vec::new();
        let cached: Vec<RegionSynapses> = regions
            .iter()
            .map(|region| {
                let synapses: Vec<Arc<Synapse>> = region
                    .all_synapses()
                    .into_iter()
                    .filter(|s| s.is_alive() && seen.insert(s.id()))
                    .collect();
                known.extend(synapses.iter().map(Arc::downgrade));
                RegionSynapses {
                    region: Arc::clone(region),
                    synapses,
                }
            })
            .collect();
        self.syn_state.lock().known_synapses = known;
        cached
    }

    // ------------------------------------------------------------------
    // Shared gating helpers
    // ------------------------------------------------------------------

    /// Developmental multiplier for `kind` in `region`; `None` when restricted
    pub(crate) fn developmental_scale(&self, kind: LearningKind, region: &str) -> Option<f32> {
        match self.developmental.read().as_ref() {
            Some(m) => m
                .learning_modulation(kind, region)
                .unwrap_or_default()
                .scale(),
            None => Some(1.0),
        }
    }

    /// Rate multiplier from competence under `ScaleLearningRates`
    pub(crate) fn competence_rate_scale(&self, config: &LearningConfig) -> f32 {
        match config.competence.competence_mode {
            CompetenceMode::ScaleLearningRates => self.competence(),
            _ => 1.0,
        }
    }

    /// Effective per-synapse update probability
    pub(crate) fn effective_p_gate(&self, config: &LearningConfig) -> f32 {
        match config.competence.competence_mode {
            CompetenceMode::ScalePGate => (config.p_gate * self.competence()).clamp(0.0, 1.0),
            _ => config.p_gate,
        }
    }

    /// Bernoulli draw; `p >= 1` always passes without touching the RNG
    pub(crate) fn gate(&self, p: f32, rng: &mut StdRng) -> bool {
        if p >= 1.0 {
            true
        } else if p <= 0.0 {
            false
        } else {
            rng.gen::<f32>() < p
        }
    }

    pub(crate) fn update_competence(&self, reward: f32, config: &LearningConfig) {
        let rho = config.competence.competence_rho;
        let s_norm = ((reward + 2.0) / 4.0).clamp(0.0, 1.0);
        let _ = self
            .competence
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                let c = f32::from_bits(bits);
                let next = ((1.0 - rho) * c + rho * s_norm).clamp(0.0, 1.0);
                Some(next.to_bits())
            });
    }

    pub(crate) fn emit(&self, event: &str, payload: serde_json::Value) {
        let telemetry = self.telemetry.read().clone();
        telemetry.emit(event, self.steps(), payload);
    }

    // ------------------------------------------------------------------
    // Intrinsic motivation
    // ------------------------------------------------------------------

    /// Intrinsic reward for one prediction error; 0 when disabled
    pub fn compute_intrinsic_reward(&self, prediction_error: f32) -> f32 {
        let signal = self.intrinsic.lock().observe(prediction_error);
        self.stats.lock().last_intrinsic_reward = signal.reward;
        signal.reward
    }

    pub fn intrinsic_signal(&self) -> crate::intrinsic::IntrinsicSignal {
        self.intrinsic.lock().last_signal()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Clear traces, spike times and attention, then go inactive
    ///
    /// Repeated calls are no-ops.
    pub fn shutdown(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        let known = {
            let mut state = self.syn_state.lock();
            state.attention_map.clear();
            std::mem::take(&mut state.known_synapses)
        };
        for synapse in known.iter().filter_map(Weak::upgrade) {
            synapse.clear_eligibility();
        }
        {
            let mut times = self.spike_times.lock();
            times.last.clear();
            times.fresh.clear();
        }
        self.pending_reward.store(0.0f32.to_bits(), Ordering::Release);
        self.intrinsic.lock().reset();
        info!(target: "plasticity", steps = self.steps(), "learning system shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_extremes_do_not_draw() {
        let ls = LearningSystem::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut probe = rng.clone();
        assert!(ls.gate(1.0, &mut rng));
        assert!(!ls.gate(0.0, &mut rng));
        assert_eq!(rng.gen::<u64>(), probe.gen::<u64>());
    }

    #[test]
    fn test_competence_stays_in_unit_interval() {
        let ls = LearningSystem::default();
        let config = ls.config();
        for _ in 0..500 {
            ls.update_competence(2.0, &config);
        }
        assert!(ls.competence() <= 1.0 && ls.competence() > 0.99);
        for _ in 0..500 {
            ls.update_competence(-2.0, &config);
        }
        assert!(ls.competence() >= 0.0 && ls.competence() < 0.01);
    }

    #[test]
    fn test_inactive_step_is_noop() {
        let ls = LearningSystem::default();
        ls.shutdown();
        ls.update_learning(0.016, &[]);
        assert_eq!(ls.steps(), 0);
    }
}
