// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Metabolic Backend Abstraction
//!
//! Mitochondrial energy/health updates run either through the scalar kernel
//! or through a batched kernel over parallel arrays. Both produce identical
//! numbers; the batched one only pays off for large populations.
//!
//! A region picks its backend per step with [`select_backend`]. If the
//! accelerated backend reports an error the region redoes the step with
//! [`ScalarBackend`], which cannot fail on well-formed input.

mod batched;
mod scalar;

pub use batched::BatchedBackend;
pub use scalar::ScalarBackend;

use hypergraph_npu_neural::MitoParams;

use crate::error::{BackendError, Result};

/// Mitochondrial update over parallel arrays
pub trait MitoBackend: Send + Sync {
    /// Backend name for logging and telemetry
    fn backend_name(&self) -> &str;

    /// Advance `energy` and `health` in place by one step
    ///
    /// All three slices must have the same length.
    fn step(
        &self,
        energy: &mut [f32],
        health: &mut [f32],
        activity: &[f32],
        params: &MitoParams,
    ) -> Result<()>;
}

/// Backend type enum for construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    /// Per-neuron scalar kernel
    Scalar,

    /// Parallel-array kernel fanned out with rayon
    Batched,

    /// Pick by population size
    #[default]
    Auto,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Scalar => write!(f, "scalar"),
            BackendType::Batched => write!(f, "batched"),
            BackendType::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "scalar" | "cpu" => Ok(BackendType::Scalar),
            "batched" | "batch" => Ok(BackendType::Batched),
            "auto" => Ok(BackendType::Auto),
            _ => Err(BackendError::InvalidBackend(s.to_string())),
        }
    }
}

/// Configuration for backend auto-selection
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Minimum neurons to use the batched kernel (default: 1000)
    pub batch_threshold: usize,

    /// Force the scalar kernel even for large regions
    pub force_scalar: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            batch_threshold: 1000,
            force_scalar: false,
        }
    }
}

/// Backend selection decision with rationale
#[derive(Debug, Clone)]
pub struct BackendDecision {
    pub backend_type: BackendType,
    pub reason: String,
}

/// Choose a backend for a population of `neuron_count`
pub fn select_backend(neuron_count: usize, config: &BackendConfig) -> BackendDecision {
    if config.force_scalar {
        return BackendDecision {
            backend_type: BackendType::Scalar,
            reason: "Forced scalar via configuration".to_string(),
        };
    }

    if neuron_count >= config.batch_threshold {
        BackendDecision {
            backend_type: BackendType::Batched,
            reason: format!(
                "{} neurons >= batch threshold {}",
                neuron_count, config.batch_threshold
            ),
        }
    } else {
        BackendDecision {
            backend_type: BackendType::Scalar,
            reason: format!(
                "{} neurons below batch threshold {}",
                neuron_count, config.batch_threshold
            ),
        }
    }
}

pub(crate) fn check_lengths(energy: &[f32], health: &[f32], activity: &[f32]) -> Result<()> {
    let expected = energy.len();
    for actual in [health.len(), activity.len()] {
        if actual != expected {
            return Err(BackendError::LengthMismatch { expected, actual });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_parse() {
        assert_eq!("CPU".parse::<BackendType>().unwrap(), BackendType::Scalar);
        assert_eq!("batched".parse::<BackendType>().unwrap(), BackendType::Batched);
        assert!("gpu".parse::<BackendType>().is_err());
        assert_eq!(BackendType::Auto.to_string(), "auto");
    }

    #[test]
    fn test_select_backend_threshold() {
        let config = BackendConfig {
            batch_threshold: 100,
            force_scalar: false,
        };
        assert_eq!(select_backend(99, &config).backend_type, BackendType::Scalar);
        assert_eq!(select_backend(100, &config).backend_type, BackendType::Batched);

        let forced = BackendConfig {
            force_scalar: true,
            ..config
        };
        assert_eq!(select_backend(10_000, &forced).backend_type, BackendType::Scalar);
    }

    #[test]
    fn test_backends_agree() {
        let params = MitoParams::default();
        let activity: Vec<f32> = (0..2048).map(|i| (i % 10) as f32 / 9.0).collect();

        let mut e1 = vec![0.5; activity.len()];
        let mut h1 = vec![0.9; activity.len()];
        let mut e2 = e1.clone();
        let mut h2 = h1.clone();

        ScalarBackend.step(&mut e1, &mut h1, &activity, &params).unwrap();
        BatchedBackend::default().step(&mut e2, &mut h2, &activity, &params).unwrap();

        assert_eq!(e1, e2);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut e = vec![1.0; 4];
        let mut h = vec![1.0; 3];
        let err = ScalarBackend
            .step(&mut e, &mut h, &[0.0; 4], &MitoParams::default())
            .unwrap_err();
        assert_eq!(err, BackendError::LengthMismatch { expected: 4, actual: 3 });
    }
}
