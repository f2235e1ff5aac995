// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Hypergraph - hierarchical hypergraph brain substrate
//!
//! Regions of leaky, threshold-firing neurons joined by weighted synapses,
//! gated by per-neuron mitochondrial energy and trained online by Hebbian,
//! STDP and reward-modulated plasticity. This crate re-exports every member
//! of the workspace.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! hypergraph = "0.3"
//! ```
//!
//! ```rust
//! use hypergraph::prelude::*;
//!
//! let brain = HypergraphBrain::new(HypergraphConfig::default());
//! brain.add_region_from_registry("v1", "vision", 32).unwrap();
//! brain.map_modality("camera", "vision").unwrap();
//!
//! brain.feed_external_pattern("camera", &[0.9; 32]);
//! brain.process_step(0.016);
//! brain.deliver_reward(1.0, "task", r#"{"trial": 1}"#);
//! brain.process_step(0.016);
//!
//! assert_eq!(brain.readout("camera").unwrap().len(), 32);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: hypergraph-config, hypergraph-observability│
//! │  (TOML config, tracing, telemetry, persistence)         │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  NPU: neural, region-engine, plasticity                 │
//! │  (Neuron, Synapse, Region, LearningSystem)              │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Algorithms: hypergraph-brain-development               │
//! │  (region registry, specialised regions)                 │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Orchestration: hypergraph-brain                        │
//! │  (HypergraphBrain step loop)                            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Feature Flags
//!
//! - **`file-logging`**: rolling log files through `tracing-appender`
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use hypergraph_config as config;
pub use hypergraph_observability as observability;

// Re-export NPU
pub use hypergraph_npu_neural as neural;
pub use hypergraph_npu_plasticity as plasticity;
pub use hypergraph_npu_region_engine as region_engine;

// Re-export algorithms and orchestration
pub use hypergraph_brain as brain;
pub use hypergraph_brain_development as brain_development;

/// Umbrella crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::brain::{BrainError, BrainStats, HypergraphBrain, StepReport};
    pub use crate::brain_development::{RegionRegistry, RegistryError};
    pub use crate::config::{HypergraphConfig, LearningConfig, ProcessingMode, RegionConfig};
    pub use crate::neural::{Neuron, NeuronId, RegionId, SpikeEvent, Synapse, SynapseId, SynapseType};
    pub use crate::observability::{
        MemoryPersistence, MemoryTelemetry, PersistenceSink, TelemetryHandle, TelemetrySink,
    };
    pub use crate::plasticity::{LearningStats, LearningSystem};
    pub use crate::region_engine::{ActivationPattern, Region, RegionBuilder, RegionStats, RegionType};
}
