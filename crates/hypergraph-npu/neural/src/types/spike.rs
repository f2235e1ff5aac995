// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use super::ids::NeuronId;
use serde::{Deserialize, Serialize};

/// A threshold crossing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeEvent {
    pub neuron_id: NeuronId,
    /// Simulation time in milliseconds
    pub time_ms: f64,
}
