// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `hypergraph.toml`. Every record is `#[serde(default)]`, so a partial file
//! only overrides the fields it names.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HypergraphConfig {
    pub system: SystemConfig,
    pub logging: LoggingConfig,
    pub brain: BrainConfig,
    pub region: RegionConfig,
    pub learning: LearningConfig,
}

/// System-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub debug: bool,
    pub log_level: String,
    pub data_dir: PathBuf,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            data_dir: PathBuf::from(""),
        }
    }
}

/// Logging output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `"text"` or `"json"`
    pub format: String,
    pub file_output: bool,
    pub log_dir: PathBuf,
    pub log_file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            file_output: false,
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: "hypergraph".to_string(),
        }
    }
}

/// How the orchestrator iterates regions within a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    #[default]
    Sequential,
    Parallel,
}

impl std::str::FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(Self::Sequential),
            "parallel" | "par" => Ok(Self::Parallel),
            other => Err(format!("unknown processing mode '{}'", other)),
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrainConfig {
    pub processing_mode: ProcessingMode,
    pub seed: u64,
    /// Region statistics are published every N steps (0 disables)
    pub telemetry_interval_steps: u64,
    /// Learning statistics are persisted every N steps (0 disables)
    pub persistence_interval_steps: u64,
    pub telemetry_version: u32,
    pub telemetry_phase: String,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            processing_mode: ProcessingMode::Sequential,
            seed: 42,
            telemetry_interval_steps: 100,
            persistence_interval_steps: 500,
            telemetry_version: 1,
            telemetry_phase: "core".to_string(),
        }
    }
}

/// Per-region dynamics and metabolism
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegionConfig {
    pub firing_threshold: f32,
    pub decay_rate: f32,
    /// Refractory window in seconds
    pub refractory_period: f32,
    pub weight_min: f32,
    pub weight_max: f32,
    /// Per-step |Δw| cap; `None` means clamp only
    pub max_weight_step: Option<f32>,
    pub mito_production_rate: f32,
    pub mito_base_consumption: f32,
    /// Neuron count at which the batched mitochondrial kernel is used
    pub accelerator_threshold: usize,
    pub exploration_noise: bool,
    /// R-STDP-lite gain used by `apply_neuromodulator`
    pub neuromod_eta: f32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            firing_threshold: 0.7,
            decay_rate: 0.1,
            refractory_period: 0.002,
            weight_min: 0.0,
            weight_max: 1.0,
            max_weight_step: None,
            mito_production_rate: 0.01,
            mito_base_consumption: 0.003,
            accelerator_threshold: 1000,
            exploration_noise: true,
            neuromod_eta: 0.01,
        }
    }
}

/// Source of attention weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionMode {
    #[default]
    Off,
    Saliency,
    ExternalMap,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AttentionConfig {
    pub enable_attention_modulation: bool,
    pub attention_mode: AttentionMode,
    pub attention_boost_factor: f32,
    pub a_min: f32,
    pub a_max: f32,
    pub anneal_ms: f32,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            enable_attention_modulation: false,
            attention_mode: AttentionMode::Off,
            attention_boost_factor: 1.5,
            a_min: 0.5,
            a_max: 3.0,
            anneal_ms: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HomeostasisConfig {
    pub enable_homeostasis: bool,
    pub homeostasis_eta: f32,
}

impl Default for HomeostasisConfig {
    fn default() -> Self {
        Self {
            enable_homeostasis: false,
            homeostasis_eta: 0.001,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetenceMode {
    #[default]
    Off,
    ScaleLearningRates,
    ScalePGate,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompetenceConfig {
    pub competence_mode: CompetenceMode,
    pub competence_rho: f32,
}

impl Default for CompetenceConfig {
    fn default() -> Self {
        Self {
            competence_mode: CompetenceMode::Off,
            competence_rho: 0.05,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StructuralPlasticityConfig {
    pub enabled: bool,
    pub interval_steps: u64,
    pub max_regions_per_cycle: usize,
    pub prune_threshold: f32,
    pub spawn_batch: usize,
    pub grow_batch: usize,
    pub energy_gate: f32,
    /// Activation a neuron needs to take part in synapse growth
    pub grow_min_activation: f32,
    pub grow_initial_weight: f32,
    pub max_metabolic_stress: f32,
}

impl Default for StructuralPlasticityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_steps: 100,
            max_regions_per_cycle: 4,
            prune_threshold: 0.01,
            spawn_batch: 4,
            grow_batch: 8,
            energy_gate: 0.5,
            grow_min_activation: 0.6,
            grow_initial_weight: 0.05,
            max_metabolic_stress: 0.5,
        }
    }
}

/// Reward-modulated plasticity and shaped-reward weights
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Trace decay λ
    pub lambda: f32,
    /// Trace gain η_elig
    pub eta_elig: f32,
    /// Reward-to-weight gain κ
    pub kappa: f32,
    /// Novelty weight α
    pub alpha: f32,
    /// Task reward weight γ
    pub gamma: f32,
    /// Variance penalty η
    pub eta: f32,
    /// Mimicry weight μ
    pub mu: f32,
    pub novelty_obs_weight: f32,
    pub novelty_sub_weight: f32,
    /// EMA β for the observation and activation means
    pub ema_beta: f32,
    pub auto_eligibility: bool,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            lambda: 0.9,
            eta_elig: 0.1,
            kappa: 0.1,
            alpha: 0.5,
            gamma: 1.0,
            eta: 0.1,
            mu: 0.0,
            novelty_obs_weight: 0.5,
            novelty_sub_weight: 0.5,
            ema_beta: 0.01,
            auto_eligibility: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IntrinsicMotivationConfig {
    pub enabled: bool,
    pub uncertainty_weight: f32,
    pub surprise_weight: f32,
    pub prediction_error_weight: f32,
    pub history_length: usize,
    pub decay: f32,
}

impl Default for IntrinsicMotivationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            uncertainty_weight: 0.3,
            surprise_weight: 0.4,
            prediction_error_weight: 0.3,
            history_length: 100,
            decay: 0.99,
        }
    }
}

/// Learning system configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LearningConfig {
    pub hebbian_rate: f32,
    pub stdp_rate: f32,
    pub stdp_rate_multiplier: f32,
    /// Consolidation weight decay
    pub decay_rate: f32,
    pub global_learning_rate: f32,
    /// Probability an eligible synapse is updated this step
    pub p_gate: f32,
    /// Seconds between consolidation passes
    pub consolidation_interval: f32,
    pub attention: AttentionConfig,
    pub homeostasis: HomeostasisConfig,
    pub competence: CompetenceConfig,
    pub structural: StructuralPlasticityConfig,
    pub reward: RewardConfig,
    pub intrinsic: IntrinsicMotivationConfig,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            hebbian_rate: 0.01,
            stdp_rate: 0.005,
            stdp_rate_multiplier: 1.0,
            decay_rate: 0.0001,
            global_learning_rate: 1.0,
            p_gate: 1.0,
            consolidation_interval: 10.0,
            attention: AttentionConfig::default(),
            homeostasis: HomeostasisConfig::default(),
            competence: CompetenceConfig::default(),
            structural: StructuralPlasticityConfig::default(),
            reward: RewardConfig::default(),
            intrinsic: IntrinsicMotivationConfig::default(),
        }
    }
}

fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

fn non_negative(v: f32, fallback: f32) -> f32 {
    finite_or(v, fallback).max(0.0)
}

fn unit(v: f32, fallback: f32) -> f32 {
    finite_or(v, fallback).clamp(0.0, 1.0)
}

impl LearningConfig {
    /// Copy with every field forced into its legal range.
    ///
    /// Non-finite values fall back to the default for that field.
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let mut c = self.clone();

        c.hebbian_rate = non_negative(c.hebbian_rate, d.hebbian_rate);
        c.stdp_rate = non_negative(c.stdp_rate, d.stdp_rate);
        c.stdp_rate_multiplier = non_negative(c.stdp_rate_multiplier, d.stdp_rate_multiplier);
        c.decay_rate = unit(c.decay_rate, d.decay_rate);
        c.global_learning_rate = non_negative(c.global_learning_rate, d.global_learning_rate);
        c.p_gate = unit(c.p_gate, d.p_gate);
        c.consolidation_interval =
            non_negative(c.consolidation_interval, d.consolidation_interval);

        let da = &d.attention;
        let a = &mut c.attention;
        a.a_min = non_negative(a.a_min, da.a_min);
        a.a_max = finite_or(a.a_max, da.a_max).max(a.a_min);
        a.attention_boost_factor =
            finite_or(a.attention_boost_factor, da.attention_boost_factor).clamp(a.a_min, a.a_max);
        a.anneal_ms = non_negative(a.anneal_ms, da.anneal_ms);

        c.homeostasis.homeostasis_eta =
            non_negative(c.homeostasis.homeostasis_eta, d.homeostasis.homeostasis_eta);
        c.competence.competence_rho =
            unit(c.competence.competence_rho, d.competence.competence_rho);

        let ds = &d.structural;
        let s = &mut c.structural;
        s.interval_steps = s.interval_steps.max(1);
        s.prune_threshold = non_negative(s.prune_threshold, ds.prune_threshold);
        s.energy_gate = unit(s.energy_gate, ds.energy_gate);
        s.grow_min_activation = unit(s.grow_min_activation, ds.grow_min_activation);
        s.grow_initial_weight = non_negative(s.grow_initial_weight, ds.grow_initial_weight);
        s.max_metabolic_stress = unit(s.max_metabolic_stress, ds.max_metabolic_stress);

        let dr = &d.reward;
        let r = &mut c.reward;
        r.lambda = unit(r.lambda, dr.lambda);
        r.eta_elig = non_negative(r.eta_elig, dr.eta_elig);
        r.kappa = non_negative(r.kappa, dr.kappa);
        r.alpha = finite_or(r.alpha, dr.alpha);
        r.gamma = finite_or(r.gamma, dr.gamma);
        r.eta = finite_or(r.eta, dr.eta);
        r.mu = finite_or(r.mu, dr.mu);
        r.novelty_obs_weight = non_negative(r.novelty_obs_weight, dr.novelty_obs_weight);
        r.novelty_sub_weight = non_negative(r.novelty_sub_weight, dr.novelty_sub_weight);
        r.ema_beta = unit(r.ema_beta, dr.ema_beta);

        let di = &d.intrinsic;
        let i = &mut c.intrinsic;
        i.uncertainty_weight = non_negative(i.uncertainty_weight, di.uncertainty_weight);
        i.surprise_weight = non_negative(i.surprise_weight, di.surprise_weight);
        i.prediction_error_weight =
            non_negative(i.prediction_error_weight, di.prediction_error_weight);
        i.history_length = i.history_length.max(2);
        i.decay = unit(i.decay, di.decay);

        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: HypergraphConfig = toml::from_str(
            r#"
            [learning]
            hebbian_rate = 0.2

            [learning.attention]
            attention_mode = "external_map"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.learning.hebbian_rate, 0.2);
        assert_eq!(cfg.learning.attention.attention_mode, AttentionMode::ExternalMap);
        assert_eq!(cfg.learning.p_gate, 1.0);
        assert_eq!(cfg.region.accelerator_threshold, 1000);
    }

    #[test]
    fn test_sanitized_clamps_out_of_range() {
        let mut cfg = LearningConfig::default();
        cfg.p_gate = 4.0;
        cfg.hebbian_rate = -1.0;
        cfg.stdp_rate = f32::NAN;
        cfg.attention.a_min = 2.0;
        cfg.attention.a_max = 1.0;
        cfg.attention.attention_boost_factor = 10.0;
        cfg.competence.competence_rho = 3.0;

        let s = cfg.sanitized();
        assert_eq!(s.p_gate, 1.0);
        assert_eq!(s.hebbian_rate, 0.0);
        assert_eq!(s.stdp_rate, LearningConfig::default().stdp_rate);
        assert_eq!(s.attention.a_max, 2.0);
        assert_eq!(s.attention.attention_boost_factor, 2.0);
        assert_eq!(s.competence.competence_rho, 1.0);
    }

    #[test]
    fn test_processing_mode_from_str() {
        assert_eq!("Parallel".parse::<ProcessingMode>().unwrap(), ProcessingMode::Parallel);
        assert_eq!("seq".parse::<ProcessingMode>().unwrap(), ProcessingMode::Sequential);
        assert!("sideways".parse::<ProcessingMode>().is_err());
    }
}
