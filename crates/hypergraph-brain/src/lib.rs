// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Hypergraph Brain

Step orchestrator over a set of regions:
- Regions run in a fixed processing order, sequentially or across the rayon
  pool ([`hypergraph_config::ProcessingMode`])
- Modalities route sensory input, readout and neuromodulators to regions
- Rewards (external, survival, intrinsic) reach the learning system and are
  logged to telemetry and an optional persistence sink
- Region and learning statistics are published on fixed step intervals

```
use hypergraph_brain::HypergraphBrain;
use hypergraph_npu_region_engine::{ActivationPattern, RegionType};

let brain = HypergraphBrain::default();
brain.create_region("v1", 16, RegionType::Cortical, ActivationPattern::Layered).unwrap();
brain.map_modality("vision", "v1").unwrap();
brain.feed_external_pattern("vision", &[1.0; 16]);
brain.process_step(0.01);
assert_eq!(brain.readout("vision").unwrap().len(), 16);
```

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod brain;
pub mod error;

pub use brain::{BrainStats, HypergraphBrain, StepReport};
pub use error::{BrainError, BrainResult};
