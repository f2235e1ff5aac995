// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # HypergraphBrain
//!
//! Owns the regions in their processing order, the modality map, the
//! learning system and the telemetry and persistence bindings.
//!
//! ## Step contract
//!
//! 1. every region runs `process(dt)`, sequentially or on the rayon pool
//! 2. the spikes of the step are handed to the learning system
//! 3. `update_learning(dt)` runs once over all regions
//! 4. periodic region statistics and learning rows are published
//!
//! The topology lock is only held to clone the region list; no region or
//! learning work runs under it.

mod io;
mod reporting;
mod step;

pub use reporting::BrainStats;
pub use step::StepReport;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use hypergraph_brain_development::RegionRegistry;
use hypergraph_config::{HypergraphConfig, ProcessingMode};
use hypergraph_npu_neural::{Neuron, NeuronId, RegionId, Synapse, SynapseType};
use hypergraph_npu_plasticity::LearningSystem;
use hypergraph_npu_region_engine::{ActivationPattern, Region, RegionBuilder, RegionType};
use hypergraph_observability::{PersistenceSink, RunId, TelemetryHandle};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{BrainError, BrainResult};

#[derive(Default)]
struct Topology {
    order: Vec<Arc<Region>>,
    by_name: AHashMap<String, usize>,
    modalities: AHashMap<String, RegionId>,
}

impl Topology {
    fn by_id(&self, id: RegionId) -> Option<&Arc<Region>> {
        self.order.iter().find(|r| r.id() == id)
    }
}

struct PersistenceBinding {
    sink: Arc<dyn PersistenceSink>,
    run_id: RunId,
}

/// Per-region seed derived from the brain seed and the region's slot
fn region_seed(seed: u64, slot: usize) -> u64 {
    seed ^ (slot as u64 + 1).wrapping_mul(0xA24B_AED4_963E_E407)
}

pub struct HypergraphBrain {
    config: HypergraphConfig,
    topology: RwLock<Topology>,
    learning: Arc<LearningSystem>,
    telemetry: RwLock<TelemetryHandle>,
    persistence: RwLock<Option<PersistenceBinding>>,
    processing_mode: RwLock<ProcessingMode>,
    seed: AtomicU64,
    step: AtomicU64,
    /// f64 bits of the rate of the last step
    step_hz: AtomicU64,
    active: AtomicBool,
}

impl std::fmt::Debug for HypergraphBrain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HypergraphBrain")
            .field("regions", &self.region_count())
            .field("step", &self.steps())
            .field("processing_mode", &self.processing_mode())
            .field("active", &self.is_active())
            .finish()
    }
}

impl Default for HypergraphBrain {
    fn default() -> Self {
        Self::new(HypergraphConfig::default())
    }
}

impl HypergraphBrain {
    /// Empty brain; the learning system is seeded from `config.brain.seed`
    pub fn new(config: HypergraphConfig) -> Self {
        let learning = Arc::new(LearningSystem::new(config.learning.clone()));
        learning.set_random_seed(config.brain.seed);
        info!(
            target: "brain",
            seed = config.brain.seed,
            mode = ?config.brain.processing_mode,
            "brain initialized"
        );
        Self {
            processing_mode: RwLock::new(config.brain.processing_mode),
            seed: AtomicU64::new(config.brain.seed),
            config,
            topology: RwLock::new(Topology::default()),
            learning,
            telemetry: RwLock::new(TelemetryHandle::disabled()),
            persistence: RwLock::new(None),
            step: AtomicU64::new(0),
            step_hz: AtomicU64::new(0.0f64.to_bits()),
            active: AtomicBool::new(true),
        }
    }

    pub fn config(&self) -> &HypergraphConfig {
        &self.config
    }

    pub fn learning(&self) -> &Arc<LearningSystem> {
        &self.learning
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn steps(&self) -> u64 {
        self.step.load(Ordering::Relaxed)
    }

    pub fn processing_mode(&self) -> ProcessingMode {
        *self.processing_mode.read()
    }

    pub fn set_processing_mode(&self, mode: ProcessingMode) {
        *self.processing_mode.write() = mode;
        debug!(target: "brain", ?mode, "processing mode changed");
    }

    /// Reseed the learning system and every region deterministically
    pub fn set_random_seed(&self, seed: u64) {
        self.seed.store(seed, Ordering::Relaxed);
        self.learning.set_random_seed(seed);
        for (slot, region) in self.regions().iter().enumerate() {
            region.set_random_seed(region_seed(seed, slot));
        }
    }

    // ------------------------------------------------------------------
    // Topology
    // ------------------------------------------------------------------

    /// Append a region to the processing order
    ///
    /// Names must be unique. The region inherits the brain's telemetry.
    pub fn add_region(&self, region: Arc<Region>) -> BrainResult<RegionId> {
        let mut topo = self.topology.write();
        if topo.by_name.contains_key(region.name()) || topo.by_id(region.id()).is_some() {
            return Err(BrainError::DuplicateRegion(region.name().to_string()));
        }
        region.set_telemetry(self.telemetry.read().clone());
        let id = region.id();
        let slot = topo.order.len();
        topo.by_name.insert(region.name().to_string(), slot);
        topo.order.push(Arc::clone(&region));
        drop(topo);

        info!(
            target: "brain",
            region = %region.name(),
            id = %id,
            neurons = region.neuron_count(),
            "region added"
        );
        Ok(id)
    }

    /// Build a generic region from the brain's region config and add it
    pub fn create_region(
        &self,
        name: &str,
        neuron_count: usize,
        region_type: RegionType,
        pattern: ActivationPattern,
    ) -> BrainResult<Arc<Region>> {
        if self.region(name).is_some() {
            return Err(BrainError::DuplicateRegion(name.to_string()));
        }
        let slot = self.region_count();
        let region = RegionBuilder::new(name)
            .region_type(region_type)
            .pattern(pattern)
            .config(&self.config.region)
            .neurons(neuron_count)
            .seed(region_seed(self.seed.load(Ordering::Relaxed), slot))
            .build();
        self.add_region(Arc::clone(&region))?;
        Ok(region)
    }

    /// Build a region through the global registry (key or alias) and add it
    pub fn add_region_from_registry(
        &self,
        key: &str,
        name: &str,
        neuron_count: usize,
    ) -> BrainResult<Arc<Region>> {
        if self.region(name).is_some() {
            return Err(BrainError::DuplicateRegion(name.to_string()));
        }
        let region = RegionRegistry::global().try_create(key, name, neuron_count)?;
        region.set_random_seed(region_seed(self.seed.load(Ordering::Relaxed), self.region_count()));
        self.add_region(Arc::clone(&region))?;
        Ok(region)
    }

    /// Regions in processing order
    pub fn regions(&self) -> Vec<Arc<Region>> {
        self.topology.read().order.clone()
    }

    pub fn region_count(&self) -> usize {
        self.topology.read().order.len()
    }

    pub fn region(&self, name: &str) -> Option<Arc<Region>> {
        let topo = self.topology.read();
        topo.by_name.get(name).map(|&slot| Arc::clone(&topo.order[slot]))
    }

    pub fn region_by_id(&self, id: RegionId) -> Option<Arc<Region>> {
        self.topology.read().by_id(id).cloned()
    }

    /// Route `modality` to the region called `region_name`
    ///
    /// Remapping an existing modality replaces the previous target.
    pub fn map_modality(&self, modality: &str, region_name: &str) -> BrainResult<()> {
        let mut topo = self.topology.write();
        let Some(&slot) = topo.by_name.get(region_name) else {
            return Err(BrainError::UnknownRegion(region_name.to_string()));
        };
        let id = topo.order[slot].id();
        topo.modalities.insert(modality.to_string(), id);
        debug!(target: "brain", modality, region = region_name, "modality mapped");
        Ok(())
    }

    /// Region a modality is routed to
    pub fn modality_region(&self, modality: &str) -> Option<Arc<Region>> {
        let topo = self.topology.read();
        let id = *topo.modalities.get(modality)?;
        topo.by_id(id).cloned()
    }

    /// Modality names, sorted
    pub fn modalities(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topology.read().modalities.keys().cloned().collect();
        names.sort();
        names
    }

    /// Wire a neuron of `from` to a neuron of `to`
    ///
    /// Same-region pairs become internal synapses. Idempotent per ordered
    /// neuron pair; `None` when a region or neuron does not resolve.
    pub fn connect(
        &self,
        from: &str,
        source: NeuronId,
        to: &str,
        target: NeuronId,
        weight: f32,
        kind: SynapseType,
    ) -> Option<Arc<Synapse>> {
        let src_region = self.region(from)?;
        let tgt_region = self.region(to)?;
        src_region.connect_to_region(&tgt_region, source, target, weight, kind)
    }

    /// Look a neuron up in every region
    pub fn neuron(&self, id: NeuronId) -> Option<Arc<Neuron>> {
        self.regions().iter().find_map(|r| r.neuron(id))
    }

    /// Remove a neuron wherever it lives
    ///
    /// The owning region drops every touching synapse from its own maps and
    /// from those of the regions it is wired to; a purge of every region
    /// then clears anything left with a dead endpoint.
    pub fn remove_neuron(&self, id: NeuronId) -> bool {
        let regions = self.regions();
        let Some(owner) = regions.iter().find(|r| r.contains_neuron(id)) else {
            return false;
        };
        if !owner.remove_neuron(id) {
            return false;
        }
        let purged: usize = regions.iter().map(|r| r.purge_dead_synapses()).sum();
        debug!(target: "brain", neuron = %id, region = %owner.name(), purged, "neuron removed");
        true
    }

    /// Structural invariants of every region
    pub fn check_invariants(&self) -> Result<(), String> {
        for region in self.regions() {
            region
                .check_invariants()
                .map_err(|e| format!("{}: {}", region.name(), e))?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Stop stepping and shut the learning system down; idempotent
    pub fn shutdown(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        self.learning.shutdown();
        info!(target: "brain", steps = self.steps(), "brain shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brain() -> HypergraphBrain {
        HypergraphBrain::default()
    }

    #[test]
    fn test_duplicate_region_name_rejected() {
        let b = brain();
        b.create_region("cortex", 4, RegionType::Cortical, ActivationPattern::Synchronous)
            .unwrap();
        let err = b
            .create_region("cortex", 2, RegionType::Cortical, ActivationPattern::Synchronous)
            .unwrap_err();
        assert_eq!(err, BrainError::DuplicateRegion("cortex".to_string()));
        assert_eq!(b.region_count(), 1);
    }

    #[test]
    fn test_modality_requires_known_region() {
        let b = brain();
        assert_eq!(
            b.map_modality("vision", "nowhere"),
            Err(BrainError::UnknownRegion("nowhere".to_string()))
        );
        b.create_region("v", 3, RegionType::Cortical, ActivationPattern::Synchronous)
            .unwrap();
        b.map_modality("vision", "v").unwrap();
        assert_eq!(b.modality_region("vision").unwrap().name(), "v");
        assert_eq!(b.modalities(), vec!["vision".to_string()]);
    }

    #[test]
    fn test_registry_key_errors_surface() {
        let b = brain();
        let err = b.add_region_from_registry("no_such_region", "x", 4).unwrap_err();
        assert!(matches!(err, BrainError::Registry(_)));
        let pfc = b.add_region_from_registry("PFC", "pfc", 8).unwrap();
        assert_eq!(pfc.neuron_count(), 8);
        assert_eq!(b.region("pfc").unwrap().id(), pfc.id());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let b = brain();
        b.shutdown();
        b.shutdown();
        assert!(!b.is_active());
        assert!(!b.learning().is_active());
    }

    #[test]
    fn test_region_seeds_differ_by_slot() {
        assert_ne!(region_seed(42, 0), region_seed(42, 1));
        assert_eq!(region_seed(42, 3), region_seed(42, 3));
    }
}
