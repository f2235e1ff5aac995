// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Pure STDP computation
//!
//! Exponential pair rule on millisecond spike intervals:
//! - Δw = +η · exp(−|Δt|/τ) when pre fires before post (Δt > 0)
//! - Δw = −η · exp(−|Δt|/τ) otherwise

/// Conventional STDP time constant in milliseconds
pub const STDP_TAU_MS: f32 = 20.0;

/// STDP kernel parameters
#[derive(Debug, Clone, Copy)]
pub struct StdpKernel {
    pub eta: f32,
    pub tau_ms: f32,
}

impl Default for StdpKernel {
    fn default() -> Self {
        Self {
            eta: 0.01,
            tau_ms: STDP_TAU_MS,
        }
    }
}

/// Weight change for one pre/post pair
///
/// `dt_ms` is `post_time − pre_time`.
///
/// # Example
/// ```
/// use hypergraph_npu_neural::synapse::{compute_stdp_weight_change, StdpKernel};
///
/// let kernel = StdpKernel::default();
/// assert!(compute_stdp_weight_change(5.0, &kernel) > 0.0);
/// assert!(compute_stdp_weight_change(-5.0, &kernel) < 0.0);
/// ```
#[inline]
pub fn compute_stdp_weight_change(dt_ms: f32, kernel: &StdpKernel) -> f32 {
    if !dt_ms.is_finite() {
        return 0.0;
    }
    let magnitude = kernel.eta * (-dt_ms.abs() / kernel.tau_ms.max(1e-6)).exp();
    if dt_ms > 0.0 {
        magnitude
    } else {
        -magnitude
    }
}

/// Batch compute STDP weight changes with unit coefficient
///
/// Callers fold per-synapse scaling into `etas`; all three slices must have
/// the same length.
#[inline]
pub fn compute_stdp_batch(time_diffs: &[f32], etas: &[f32], tau_ms: f32, weight_changes: &mut [f32]) {
    debug_assert_eq!(time_diffs.len(), etas.len());
    debug_assert_eq!(weight_changes.len(), time_diffs.len());

    for ((out, dt), eta) in weight_changes.iter_mut().zip(time_diffs).zip(etas) {
        *out = compute_stdp_weight_change(*dt, &StdpKernel { eta: *eta, tau_ms });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdp_sign_and_magnitude() {
        let kernel = StdpKernel { eta: 0.1, tau_ms: 20.0 };
        let ltp = compute_stdp_weight_change(5.0, &kernel);
        let ltd = compute_stdp_weight_change(-5.0, &kernel);

        let expected = 0.1 * (-5.0f32 / 20.0).exp();
        assert!((ltp - expected).abs() < 1e-7);
        assert!((ltd + expected).abs() < 1e-7);
    }

    #[test]
    fn test_coincident_spikes_depress() {
        let kernel = StdpKernel::default();
        assert_eq!(compute_stdp_weight_change(0.0, &kernel), -kernel.eta);
    }

    #[test]
    fn test_stdp_exponential_decay() {
        let kernel = StdpKernel::default();
        assert!(compute_stdp_weight_change(1.0, &kernel) > compute_stdp_weight_change(10.0, &kernel));
    }

    #[test]
    fn test_batch_matches_scalar() {
        let diffs = [5.0, -5.0, 40.0];
        let etas = [0.01, 0.02, 0.01];
        let mut out = [0.0; 3];
        compute_stdp_batch(&diffs, &etas, STDP_TAU_MS, &mut out);

        for i in 0..3 {
            let scalar = compute_stdp_weight_change(diffs[i], &StdpKernel { eta: etas[i], tau_ms: STDP_TAU_MS });
            assert_eq!(out[i], scalar);
        }
        assert!(out[1] < 0.0);
    }

    #[test]
    fn test_nan_interval_is_ignored() {
        assert_eq!(compute_stdp_weight_change(f32::NAN, &StdpKernel::default()), 0.0);
    }
}
