// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Batched mitochondrial kernel
//!
//! Splits the parallel arrays into fixed chunks and runs the scalar kernel
//! on each chunk in the rayon pool. Results are checked for finiteness so a
//! corrupted input surfaces as an error instead of poisoning the region.

use hypergraph_npu_neural::{mito_step_batch, MitoParams};
use rayon::prelude::*;

use super::{check_lengths, MitoBackend};
use crate::error::{BackendError, Result};

pub struct BatchedBackend {
    chunk_size: usize,
}

impl Default for BatchedBackend {
    fn default() -> Self {
        Self { chunk_size: 256 }
    }
}

impl BatchedBackend {
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl MitoBackend for BatchedBackend {
    fn backend_name(&self) -> &str {
        "batched"
    }

    fn step(
        &self,
        energy: &mut [f32],
        health: &mut [f32],
        activity: &[f32],
        params: &MitoParams,
    ) -> Result<()> {
        check_lengths(energy, health, activity)?;

        energy
            .par_chunks_mut(self.chunk_size)
            .zip(health.par_chunks_mut(self.chunk_size))
            .zip(activity.par_chunks(self.chunk_size))
            .for_each(|((e, h), a)| mito_step_batch(e, h, a, params));

        if let Some(index) = energy
            .iter()
            .zip(health.iter())
            .position(|(e, h)| !e.is_finite() || !h.is_finite())
        {
            return Err(BackendError::NonFinite { index });
        }
        Ok(())
    }
}
