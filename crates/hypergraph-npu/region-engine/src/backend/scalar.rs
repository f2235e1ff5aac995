// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use hypergraph_npu_neural::{mito_step_batch, MitoParams};

use super::{check_lengths, MitoBackend};
use crate::error::Result;

/// Sequential kernel; the fallback every region can rely on
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarBackend;

impl MitoBackend for ScalarBackend {
    fn backend_name(&self) -> &str {
        "scalar"
    }

    fn step(
        &self,
        energy: &mut [f32],
        health: &mut [f32],
        activity: &[f32],
        params: &MitoParams,
    ) -> Result<()> {
        check_lengths(energy, health, activity)?;
        mito_step_batch(energy, health, activity, params);
        Ok(())
    }
}
