// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Reports every out-of-range value in one pass. The runtime never calls
//! this; it sanitizes instead.

use crate::{ConfigError, ConfigResult, HypergraphConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
    InvalidValue {
        field: String,
        reason: String,
    },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(
                f,
                "{} = {} is outside valid range [{}, {}]",
                field, value, min, max
            ),
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &HypergraphConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_region(config, &mut errors);
    validate_learning(config, &mut errors);
    validate_logging(config, &mut errors);

    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

fn check_range(
    field: &str,
    value: f32,
    min: f32,
    max: f32,
    errors: &mut Vec<ConfigValidationError>,
) {
    if !value.is_finite() || value < min || value > max {
        errors.push(ConfigValidationError::OutOfRange {
            field: field.to_string(),
            value: value as f64,
            min: min as f64,
            max: max as f64,
        });
    }
}

fn check_non_negative(field: &str, value: f32, errors: &mut Vec<ConfigValidationError>) {
    check_range(field, value, 0.0, f32::MAX, errors);
}

fn validate_region(config: &HypergraphConfig, errors: &mut Vec<ConfigValidationError>) {
    let r = &config.region;
    check_range("region.firing_threshold", r.firing_threshold, 0.0, 1.0, errors);
    check_non_negative("region.decay_rate", r.decay_rate, errors);
    check_non_negative("region.refractory_period", r.refractory_period, errors);
    check_non_negative("region.mito_production_rate", r.mito_production_rate, errors);
    check_non_negative("region.mito_base_consumption", r.mito_base_consumption, errors);

    if !(r.weight_min < r.weight_max) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "region.weight_min".to_string(),
            reason: format!(
                "must be less than region.weight_max ({} >= {})",
                r.weight_min, r.weight_max
            ),
        });
    }
    if let Some(cap) = r.max_weight_step {
        if !(cap > 0.0) {
            errors.push(ConfigValidationError::InvalidValue {
                field: "region.max_weight_step".to_string(),
                reason: "must be positive when set".to_string(),
            });
        }
    }
}

fn validate_learning(config: &HypergraphConfig, errors: &mut Vec<ConfigValidationError>) {
    let l = &config.learning;
    check_non_negative("learning.hebbian_rate", l.hebbian_rate, errors);
    check_non_negative("learning.stdp_rate", l.stdp_rate, errors);
    check_non_negative("learning.stdp_rate_multiplier", l.stdp_rate_multiplier, errors);
    check_range("learning.decay_rate", l.decay_rate, 0.0, 1.0, errors);
    check_non_negative("learning.global_learning_rate", l.global_learning_rate, errors);
    check_range("learning.p_gate", l.p_gate, 0.0, 1.0, errors);
    check_non_negative("learning.consolidation_interval", l.consolidation_interval, errors);

    let a = &l.attention;
    if a.a_min > a.a_max {
        errors.push(ConfigValidationError::InvalidValue {
            field: "learning.attention.a_min".to_string(),
            reason: "must not exceed a_max".to_string(),
        });
    } else {
        check_range(
            "learning.attention.attention_boost_factor",
            a.attention_boost_factor,
            a.a_min,
            a.a_max,
            errors,
        );
    }

    check_range(
        "learning.competence.competence_rho",
        l.competence.competence_rho,
        0.0,
        1.0,
        errors,
    );

    let s = &l.structural;
    check_range("learning.structural.energy_gate", s.energy_gate, 0.0, 1.0, errors);
    check_range(
        "learning.structural.grow_min_activation",
        s.grow_min_activation,
        0.0,
        1.0,
        errors,
    );
    if s.enabled && s.interval_steps == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "learning.structural.interval_steps".to_string(),
            reason: "must be at least 1 when structural plasticity is enabled".to_string(),
        });
    }

    check_range("learning.reward.lambda", l.reward.lambda, 0.0, 1.0, errors);
    check_range("learning.reward.ema_beta", l.reward.ema_beta, 0.0, 1.0, errors);
    check_range("learning.intrinsic.decay", l.intrinsic.decay, 0.0, 1.0, errors);
}

fn validate_logging(config: &HypergraphConfig, errors: &mut Vec<ConfigValidationError>) {
    let format = config.logging.format.as_str();
    if format != "text" && format != "json" {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.format".to_string(),
            reason: "must be 'text' or 'json'".to_string(),
        });
    }
}
