// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core type definitions

pub mod error;
pub mod ids;
pub mod spike;

pub use error::{NeuralError, Result};
pub use ids::{NeuronId, RegionId, SynapseId};
pub use spike::SpikeEvent;
