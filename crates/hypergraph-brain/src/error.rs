// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use hypergraph_brain_development::RegistryError;
use thiserror::Error;

/// Topology errors raised while assembling a brain
///
/// Stepping and I/O never return these; they report absence through
/// `Option` or `bool`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrainError {
    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    #[error("Unknown modality: {0}")]
    UnknownModality(String),

    #[error("Region already registered: {0}")]
    DuplicateRegion(String),

    #[error("Region registry: {0}")]
    Registry(#[from] RegistryError),
}

pub type BrainResult<T> = Result<T, BrainError>;
