// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Mitochondrial energy and health
//!
//! ```text
//! spiking      = a > 0.8
//! production   = rate · (0.7 + 0.3·a)
//! consumption  = base + (0.012 if spiking, 0.002 if a > 0.1, else 0)
//! energy      ← clamp(energy + production − consumption, 0, 1)
//! health      ← health − 1e-5 if energy < 0.3, + 2e-5 if energy > 0.7, clamped to [0.1, 1]
//! ```

use serde::{Deserialize, Serialize};

use crate::neuron::HEALTH_MIN;

pub const SPIKING_ACTIVITY: f32 = 0.8;
pub const ACTIVE_ACTIVITY: f32 = 0.1;
pub const SPIKE_COST: f32 = 0.012;
pub const ACTIVE_COST: f32 = 0.002;
pub const STRESS_ENERGY: f32 = 0.3;
pub const RECOVERY_ENERGY: f32 = 0.7;
pub const STRESS_HEALTH_LOSS: f32 = 1e-5;
pub const RECOVERY_HEALTH_GAIN: f32 = 2e-5;

/// Per-neuron metabolic state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MitoState {
    pub energy: f32,
    pub health: f32,
}

impl Default for MitoState {
    fn default() -> Self {
        Self {
            energy: 1.0,
            health: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MitoParams {
    pub production_rate: f32,
    pub base_consumption: f32,
}

impl Default for MitoParams {
    fn default() -> Self {
        Self {
            production_rate: 0.01,
            base_consumption: 0.003,
        }
    }
}

/// Advance one neuron's metabolism by one step
#[inline]
pub fn mito_step(state: MitoState, activity: f32, params: &MitoParams) -> MitoState {
    let a = if activity.is_nan() { 0.0 } else { activity.clamp(0.0, 1.0) };

    let production = params.production_rate * (0.7 + 0.3 * a);
    let activity_cost = if a > SPIKING_ACTIVITY {
        SPIKE_COST
    } else if a > ACTIVE_ACTIVITY {
        ACTIVE_COST
    } else {
        0.0
    };
    let consumption = params.base_consumption + activity_cost;
    let energy = (state.energy + production - consumption).clamp(0.0, 1.0);

    let mut health = state.health;
    if energy < STRESS_ENERGY {
        health -= STRESS_HEALTH_LOSS;
    } else if energy > RECOVERY_ENERGY {
        health += RECOVERY_HEALTH_GAIN;
    }

    MitoState {
        energy,
        health: health.clamp(HEALTH_MIN, 1.0),
    }
}

/// Slice form over parallel arrays; all three must have the same length
#[inline]
pub fn mito_step_batch(energy: &mut [f32], health: &mut [f32], activity: &[f32], params: &MitoParams) {
    debug_assert_eq!(energy.len(), health.len());
    debug_assert_eq!(energy.len(), activity.len());

    for ((e, h), a) in energy.iter_mut().zip(health.iter_mut()).zip(activity) {
        let next = mito_step(MitoState { energy: *e, health: *h }, *a, params);
        *e = next.energy;
        *h = next.health;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_spiking_costs_more_than_idle() {
        let params = MitoParams::default();
        let start = MitoState { energy: 0.5, health: 1.0 };
        let idle = mito_step(start, 0.0, &params);
        let busy = mito_step(start, 0.9, &params);
        assert!(busy.energy < idle.energy);

        // idle: 0.5 + 0.01·0.7 − 0.003
        assert!((idle.energy - 0.504).abs() < 1e-6);
        // spiking: 0.5 + 0.01·0.97 − 0.015
        assert!((busy.energy - 0.4947).abs() < 1e-6);
    }

    #[test]
    fn test_health_drift() {
        let params = MitoParams::default();
        let stressed = mito_step(MitoState { energy: 0.1, health: 0.5 }, 0.0, &params);
        assert!((stressed.health - (0.5 - 1e-5)).abs() < 1e-7);

        let recovering = mito_step(MitoState { energy: 0.9, health: 0.5 }, 0.0, &params);
        assert!((recovering.health - (0.5 + 2e-5)).abs() < 1e-7);

        let floor = mito_step(MitoState { energy: 0.0, health: HEALTH_MIN }, 1.0, &params);
        assert_eq!(floor.health, HEALTH_MIN);
        assert_eq!(floor.energy, 0.0);
    }

    #[test]
    fn test_batch_matches_scalar() {
        let params = MitoParams::default();
        let mut energy = vec![0.2, 0.5, 0.95];
        let mut health = vec![0.5, 0.5, 0.5];
        let activity = vec![0.0, 0.5, 0.9];

        let expected: Vec<MitoState> = (0..3)
            .map(|i| mito_step(MitoState { energy: energy[i], health: health[i] }, activity[i], &params))
            .collect();
        mito_step_batch(&mut energy, &mut health, &activity, &params);

        for i in 0..3 {
            assert_eq!(energy[i], expected[i].energy);
            assert_eq!(health[i], expected[i].health);
        }
    }

    proptest! {
        #[test]
        fn mito_stays_in_range(
            energy in 0.0f32..=1.0,
            health in HEALTH_MIN..=1.0f32,
            activity in -1.0f32..2.0,
            rate in 0.0f32..0.5,
            base in 0.0f32..0.5,
        ) {
            let params = MitoParams { production_rate: rate, base_consumption: base };
            let next = mito_step(MitoState { energy, health }, activity, &params);
            prop_assert!((0.0..=1.0).contains(&next.energy));
            prop_assert!((HEALTH_MIN..=1.0).contains(&next.health));
        }
    }
}
