// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Synaptic weight bounds and clamped updates
//!
//! Pure functions for weight manipulation.

use serde::{Deserialize, Serialize};

/// Legal weight interval plus an optional per-step magnitude cap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBounds {
    pub min: f32,
    pub max: f32,
    /// `None` means clamp only
    pub max_step: Option<f32>,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            max_step: None,
        }
    }
}

impl WeightBounds {
    pub fn new(min: f32, max: f32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min,
            max,
            max_step: None,
        }
    }

    pub fn with_max_step(mut self, cap: Option<f32>) -> Self {
        self.max_step = cap.filter(|c| c.is_finite() && *c > 0.0);
        self
    }

    /// Clamp a weight into `[min, max]`; NaN maps to `min`
    #[inline]
    pub fn clamp(&self, weight: f32) -> f32 {
        if weight.is_nan() {
            return self.min;
        }
        weight.clamp(self.min, self.max)
    }

    /// Limit `delta` so that `weight + delta` stays in bounds
    ///
    /// # Example
    /// ```
    /// use hypergraph_npu_neural::synapse::WeightBounds;
    ///
    /// let bounds = WeightBounds::default();
    /// assert!((bounds.guard_delta(0.9, 0.5) - 0.1).abs() < 1e-6);
    /// assert!((bounds.guard_delta(0.2, -0.5) + 0.2).abs() < 1e-6);
    /// ```
    #[inline]
    pub fn guard_delta(&self, weight: f32, delta: f32) -> f32 {
        if !delta.is_finite() {
            return 0.0;
        }
        let delta = match self.max_step {
            Some(cap) => delta.clamp(-cap, cap),
            None => delta,
        };
        self.clamp(weight + delta) - weight
    }
}

/// Apply weight change, clamping to bounds
#[inline]
pub fn apply_weight_change(weight: f32, delta: f32, bounds: &WeightBounds) -> f32 {
    bounds.clamp(weight + bounds.guard_delta(weight, delta))
}

/// Batch apply weight changes
///
/// Slices must have the same length.
#[inline]
pub fn apply_weight_changes_batch(weights: &mut [f32], deltas: &[f32], bounds: &WeightBounds) {
    debug_assert_eq!(deltas.len(), weights.len());

    for (w, d) in weights.iter_mut().zip(deltas) {
        *w = apply_weight_change(*w, *d, bounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamp_only_by_default() {
        let b = WeightBounds::default();
        assert_eq!(apply_weight_change(0.5, 0.25, &b), 0.75);
        assert_eq!(apply_weight_change(0.5, 2.0, &b), 1.0);
        assert_eq!(apply_weight_change(0.5, -2.0, &b), 0.0);
    }

    #[test]
    fn test_step_cap() {
        let b = WeightBounds::default().with_max_step(Some(0.05));
        assert!((apply_weight_change(0.5, 0.3, &b) - 0.55).abs() < 1e-6);
        assert!((apply_weight_change(0.5, -0.3, &b) - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_non_positive_cap_is_ignored() {
        let b = WeightBounds::default().with_max_step(Some(0.0));
        assert_eq!(b.max_step, None);
    }

    #[test]
    fn test_swapped_bounds() {
        let b = WeightBounds::new(1.0, -1.0);
        assert_eq!(b.min, -1.0);
        assert_eq!(b.max, 1.0);
    }

    #[test]
    fn test_batch_apply() {
        let b = WeightBounds::default();
        let mut weights = [0.1, 0.5, 0.9];
        apply_weight_changes_batch(&mut weights, &[0.1, -0.6, 0.5], &b);
        assert!((weights[0] - 0.2).abs() < 1e-6);
        assert_eq!(weights[1], 0.0);
        assert_eq!(weights[2], 1.0);
    }

    proptest! {
        #[test]
        fn weight_stays_in_bounds(
            w in -5.0f32..5.0,
            delta in -10.0f32..10.0,
            cap in proptest::option::of(0.001f32..1.0),
        ) {
            let b = WeightBounds::new(-0.5, 0.75).with_max_step(cap);
            let start = b.clamp(w);
            let next = apply_weight_change(start, delta, &b);
            prop_assert!(next >= b.min && next <= b.max);
        }
    }
}
