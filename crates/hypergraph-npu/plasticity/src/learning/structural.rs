// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Structural plasticity: prune, spawn and grow under a metabolic gate

use std::sync::Arc;

use hypergraph_config::LearningConfig;
use hypergraph_npu_neural::SynapseType;
use hypergraph_npu_region_engine::Region;
use serde::Serialize;
use tracing::{debug, info};

use super::LearningSystem;
use crate::developmental::LearningKind;

/// Work done by one structural cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StructuralReport {
    pub regions_visited: usize,
    pub pruned: usize,
    pub spawned: usize,
    pub grown: usize,
    /// Regions where the energy/stress gate blocked spawning and growth
    pub gated: usize,
}

impl LearningSystem {
    pub(crate) fn run_structural_cycle(&self, config: &LearningConfig, regions: &[Arc<Region>]) -> StructuralReport {
        if regions.is_empty() {
            return StructuralReport::default();
        }
        let sc = &config.structural;
        let budget = sc.max_regions_per_cycle.max(1).min(regions.len());
        let start = {
            let mut schedule = self.schedule.lock();
            let start = schedule.structural_cursor % regions.len();
            schedule.structural_cursor = (start + budget) % regions.len();
            start
        };

        let mut report = StructuralReport::default();
        for offset in 0..budget {
            let region = &regions[(start + offset) % regions.len()];
            if self
                .developmental_scale(LearningKind::Structural, region.name())
                .is_none()
            {
                continue;
            }
            report.regions_visited += 1;
            report.pruned += region.prune_weak_synapses(sc.prune_threshold);

            let energy = region.average_energy();
            let stress = region.metabolic_stress();
            if energy < sc.energy_gate || stress > sc.max_metabolic_stress {
                report.gated += 1;
                debug!(target: "plasticity", region = %region.name(), energy, stress, "structural growth gated");
                continue;
            }
            report.spawned += region.spawn_neurons(sc.spawn_batch, sc.energy_gate).len();
            report.grown += region.grow_synapses(
                sc.grow_batch,
                sc.grow_min_activation,
                sc.grow_initial_weight,
                SynapseType::Excitatory,
            );
        }

        {
            let mut stats = self.stats.lock();
            stats.structural_cycles += 1;
            stats.pruned_total += report.pruned as u64;
            stats.spawned_total += report.spawned as u64;
            stats.grown_total += report.grown as u64;
        }
        info!(
            target: "plasticity",
            regions = report.regions_visited,
            pruned = report.pruned,
            spawned = report.spawned,
            grown = report.grown,
            "structural cycle"
        );
        self.emit(
            "structural",
            serde_json::to_value(report).unwrap_or_default(),
        );
        report
    }

    /// Run one structural cycle now, ignoring the step interval
    pub fn structural_cycle(&self, regions: &[Arc<Region>]) -> StructuralReport {
        if !self.is_active() {
            return StructuralReport::default();
        }
        let config = self.config();
        self.run_structural_cycle(&config, regions)
    }
}
