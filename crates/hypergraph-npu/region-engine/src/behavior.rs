// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Region specialisation hook
//!
//! A [`RegionBehavior`] carries the auxiliary state of a specialised region
//! (feature maps, episodic buffers, motor programs...) and runs after the
//! generic per-step work. It is held behind its own mutex on the region, so
//! implementations must not call [`Region::set_behavior`] or
//! [`Region::with_behavior`] from inside a hook.

use std::any::Any;
use std::sync::Arc;

use hypergraph_npu_neural::{Neuron, SpikeEvent};
use serde_json::Value;

use crate::region::Region;

pub trait RegionBehavior: Send {
    /// Registry key of the variant, e.g. `"visual"`
    fn kind(&self) -> &'static str;

    /// Called once when attached to a region
    fn configure(&mut self, _region: &Region) {}

    /// Replace the activation pattern for this step
    ///
    /// Returning `Some` skips the region's pattern; the returned spikes are
    /// reported as the step's spikes.
    fn advance_neurons(
        &mut self,
        _region: &Region,
        _neurons: &[Arc<Neuron>],
        _dt: f32,
        _now_ms: f64,
    ) -> Option<Vec<SpikeEvent>> {
        None
    }

    /// Runs last in every step, after metabolism and eligibility
    fn per_step_hook(&mut self, region: &Region, neurons: &[Arc<Neuron>], dt: f32);

    /// Auxiliary state for stats and telemetry
    fn snapshot(&self) -> Value {
        Value::Null
    }

    /// Clear auxiliary state; topology is untouched
    fn reset(&mut self) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
