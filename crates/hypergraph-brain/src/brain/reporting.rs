// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Statistics, telemetry and persistence

use std::sync::Arc;

use hypergraph_config::ProcessingMode;
use hypergraph_npu_plasticity::LearningStats;
use hypergraph_npu_region_engine::RegionStats;
use hypergraph_observability::{PersistenceError, PersistenceSink, RunId, TelemetryHandle, TelemetrySink};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::{HypergraphBrain, PersistenceBinding};

/// Snapshot of the whole brain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainStats {
    pub step: u64,
    pub step_hz: f64,
    pub processing_mode: ProcessingMode,
    pub is_active: bool,
    pub regions: Vec<RegionStats>,
    /// `(modality, region name)`, sorted by modality
    pub modalities: Vec<(String, String)>,
    pub learning: LearningStats,
}

impl HypergraphBrain {
    pub fn stats(&self) -> BrainStats {
        let (regions, modalities) = {
            let topo = self.topology.read();
            let mut modalities: Vec<(String, String)> = topo
                .modalities
                .iter()
                .filter_map(|(m, id)| topo.by_id(*id).map(|r| (m.clone(), r.name().to_string())))
                .collect();
            modalities.sort();
            (topo.order.clone(), modalities)
        };
        BrainStats {
            step: self.steps(),
            step_hz: self.step_hz(),
            processing_mode: self.processing_mode(),
            is_active: self.is_active(),
            regions: regions.iter().map(|r| r.stats()).collect(),
            modalities,
            learning: self.learning.stats(),
        }
    }

    // ------------------------------------------------------------------
    // Telemetry
    // ------------------------------------------------------------------

    /// Route telemetry of the brain, its regions and learning to `telemetry`
    pub fn set_telemetry(&self, telemetry: TelemetryHandle) {
        for region in self.regions() {
            region.set_telemetry(telemetry.clone());
        }
        self.learning.set_telemetry(telemetry.clone());
        *self.telemetry.write() = telemetry;
    }

    /// [`HypergraphBrain::set_telemetry`] with the configured version and phase
    pub fn set_telemetry_sink(&self, sink: Arc<dyn TelemetrySink>) {
        let brain = &self.config.brain;
        self.set_telemetry(TelemetryHandle::new(
            sink,
            brain.telemetry_version,
            &brain.telemetry_phase,
        ));
    }

    /// Emit one `region_stats` record per region and a `learning_stats` record
    pub fn publish_stats(&self) {
        let telemetry = self.telemetry.read().clone();
        if !telemetry.is_enabled() {
            return;
        }
        let step = self.steps();
        for region in self.regions() {
            match serde_json::to_value(region.stats()) {
                Ok(payload) => telemetry.emit("region_stats", step, payload),
                Err(e) => warn!(target: "brain", region = %region.name(), error = %e, "region stats not serializable"),
            }
        }
        match serde_json::to_value(self.learning.stats()) {
            Ok(payload) => telemetry.emit("learning_stats", step, payload),
            Err(e) => warn!(target: "brain", error = %e, "learning stats not serializable"),
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Open a run on `sink` and persist to it from now on
    ///
    /// On failure the previous binding (if any) is kept.
    pub fn set_persistence(&self, sink: Arc<dyn PersistenceSink>) -> Result<RunId, PersistenceError> {
        let meta = json!({
            "version": crate::VERSION,
            "seed": self.config.brain.seed,
            "processing_mode": self.processing_mode(),
            "regions": self.regions().iter().map(|r| r.name().to_string()).collect::<Vec<_>>(),
            "started": chrono::Utc::now().to_rfc3339(),
        });
        let run_id = sink.begin_run(&meta.to_string()).map_err(|e| {
            warn!(target: "brain", error = %e, "persistence run not started");
            e
        })?;
        *self.persistence.write() = Some(PersistenceBinding { sink, run_id });
        info!(target: "brain", run_id, "persistence attached");
        Ok(run_id)
    }

    pub fn clear_persistence(&self) {
        *self.persistence.write() = None;
    }

    pub fn persistence_run(&self) -> Option<RunId> {
        self.persistence.read().as_ref().map(|b| b.run_id)
    }

    /// Write one learning statistics row; `false` when unbound or rejected
    pub fn persist_learning_stats(&self) -> bool {
        let guard = self.persistence.read();
        let Some(binding) = guard.as_ref() else {
            return false;
        };
        let step = self.steps();
        let blob = match serde_json::to_string(&self.learning.stats()) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(target: "brain", step, error = %e, "learning stats not serializable");
                return false;
            }
        };
        let ts_ms = chrono::Utc::now().timestamp_millis();
        match binding
            .sink
            .insert_learning_stats(ts_ms, step, self.step_hz(), &blob, binding.run_id)
        {
            Ok(()) => true,
            Err(e) => {
                warn!(target: "brain", step, error = %e, "learning stats not persisted");
                false
            }
        }
    }

    /// Interval-driven publishing at the end of a step
    pub(super) fn publish_periodic(&self, step: u64) {
        let brain = &self.config.brain;
        if brain.telemetry_interval_steps > 0 && step % brain.telemetry_interval_steps == 0 {
            self.publish_stats();
        }
        if brain.persistence_interval_steps > 0 && step % brain.persistence_interval_steps == 0 {
            self.persist_learning_stats();
        }
    }
}
