// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Region factory

use std::sync::Arc;

use hypergraph_config::RegionConfig;
use hypergraph_npu_neural::RegionId;
use hypergraph_observability::TelemetryHandle;
use tracing::info;

use crate::behavior::RegionBehavior;
use crate::pattern::{ActivationPattern, RegionType};
use crate::region::Region;

/// Builds a populated [`Region`]
///
/// Without [`RegionBuilder::id`] the region takes the next automatic id;
/// an explicit id is reserved so later automatic ids skip past it.
pub struct RegionBuilder {
    name: String,
    id: Option<u64>,
    region_type: RegionType,
    pattern: ActivationPattern,
    config: RegionConfig,
    neurons: usize,
    seed: Option<u64>,
    telemetry: Option<TelemetryHandle>,
    behavior: Option<Box<dyn RegionBehavior>>,
}

impl RegionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            region_type: RegionType::default(),
            pattern: ActivationPattern::default(),
            config: RegionConfig::default(),
            neurons: 0,
            seed: None,
            telemetry: None,
            behavior: None,
        }
    }

    pub fn id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn region_type(mut self, region_type: RegionType) -> Self {
        self.region_type = region_type;
        self
    }

    pub fn pattern(mut self, pattern: ActivationPattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn config(mut self, config: &RegionConfig) -> Self {
        self.config = config.clone();
        self
    }

    pub fn neurons(mut self, count: usize) -> Self {
        self.neurons = count;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn telemetry(mut self, telemetry: TelemetryHandle) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn behavior(mut self, behavior: Box<dyn RegionBehavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    pub fn build(self) -> Arc<Region> {
        let id = match self.id {
            Some(raw) => RegionId::reserve(raw),
            None => RegionId::next(),
        };
        let region = Region::new(id, self.name, self.region_type, self.pattern, &self.config);
        if let Some(seed) = self.seed {
            region.set_random_seed(seed);
        }
        if let Some(telemetry) = self.telemetry {
            region.set_telemetry(telemetry);
        }
        region.create_neurons(self.neurons);
        if let Some(behavior) = self.behavior {
            region.set_behavior(behavior);
        }

        info!(
            target: "region",
            region = %region.name(),
            id = %region.id(),
            kind = %region.region_type(),
            pattern = %region.pattern(),
            neurons = region.neuron_count(),
            "created region"
        );
        region
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_id_is_reserved() {
        let explicit = RegionBuilder::new("explicit").id(50_000).build();
        assert_eq!(explicit.id(), RegionId(50_000));
        let auto = RegionBuilder::new("auto").build();
        assert!(auto.id().0 > 50_000);
    }

    #[test]
    fn test_build_populates_neurons() {
        let config = RegionConfig {
            firing_threshold: 0.4,
            ..Default::default()
        };
        let region = RegionBuilder::new("v1")
            .pattern(ActivationPattern::Layered)
            .config(&config)
            .neurons(12)
            .build();
        assert_eq!(region.neuron_count(), 12);
        assert_eq!(region.pattern(), ActivationPattern::Layered);
        assert_eq!(region.neurons()[0].threshold(), 0.4);
        assert_eq!(region.mito_states().len(), 12);
    }
}
