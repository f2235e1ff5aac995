// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Hypergraph Brain Development

Region registry and specialised regions:
- A process-wide keyed factory (`visual_cortex`, `hippocampus`, ...) with
  case-insensitive keys and aliases (`v1`, `pfc`, `a1`, `m1`, `s1`)
- Cortical variants: visual, auditory, motor, prefrontal, somatosensory
- Subcortical variants: hippocampus, amygdala, thalamus, brainstem

Every variant is a plain [`hypergraph_npu_region_engine::Region`] carrying a
behavior; it obeys the same population, metabolism and wiring rules.

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod regions;
pub mod registry;
pub mod types;

pub use regions::{
    with_variant, Amygdala, AuditoryCortex, Brainstem, Hippocampus, MotorCortex, PrefrontalCortex,
    SomatosensoryCortex, Thalamus, VisualCortex,
};
pub use registry::{create, list_keys, register_alias, register_factory, RegionFactory, RegionRegistry};
pub use types::{RegistryError, RegistryResult};
