// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Failure reported by a metabolic backend
///
/// Regions never surface these to callers; they fall back to the scalar
/// kernel and record the event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Slice length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Non-finite metabolic value at index {index}")]
    NonFinite { index: usize },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid backend: {0}")]
    InvalidBackend(String),
}

pub type Result<T> = std::result::Result<T, BackendError>;
