// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for neuron and synapse operations

use super::ids::{NeuronId, SynapseId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NeuralError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{synapse} does not have {neuron} as its {side} endpoint")]
    EndpointMismatch {
        synapse: SynapseId,
        neuron: NeuronId,
        side: &'static str,
    },

    #[error("{0} is already attached")]
    Duplicate(SynapseId),
}

pub type Result<T> = core::result::Result<T, NeuralError>;
