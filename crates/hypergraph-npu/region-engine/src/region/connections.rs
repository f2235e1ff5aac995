// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Connection table guarded by a region's connection mutex

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use hypergraph_npu_neural::{NeuronId, RegionId, Synapse, SynapseId};

#[derive(Default)]
pub(crate) struct Connections {
    /// Both endpoints in this region
    pub internal: Vec<Arc<Synapse>>,
    /// Incoming cross-region synapses, keyed by the local target
    pub inputs: AHashMap<NeuronId, Vec<Arc<Synapse>>>,
    /// Outgoing cross-region synapses, keyed by the local source
    pub outputs: AHashMap<NeuronId, Vec<Arc<Synapse>>>,
    /// Synapses this region created toward each peer
    pub inter_region: AHashMap<RegionId, Vec<SynapseId>>,
}

impl Connections {
    /// Every synapse referenced here, each once
    pub fn unique(&self) -> Vec<Arc<Synapse>> {
        let mut seen = AHashSet::new();
        self.internal
            .iter()
            .chain(self.inputs.values().flatten())
            .chain(self.outputs.values().flatten())
            .filter(|s| seen.insert(s.id()))
            .cloned()
            .collect()
    }

    /// Synapses whose target lives in this region
    pub fn postsynaptic(&self) -> Vec<Arc<Synapse>> {
        self.internal
            .iter()
            .chain(self.inputs.values().flatten())
            .cloned()
            .collect()
    }

    pub fn input_count(&self) -> usize {
        self.inputs.values().map(Vec::len).sum()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.values().map(Vec::len).sum()
    }

    pub fn inter_region_count(&self) -> usize {
        self.inter_region.values().map(Vec::len).sum()
    }

    /// Drop every reference to `ids`; returns how many distinct ids were found
    pub fn forget(&mut self, ids: &AHashSet<SynapseId>) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let mut removed = AHashSet::new();
        let mut note = |s: &Arc<Synapse>| {
            if ids.contains(&s.id()) {
                removed.insert(s.id());
                false
            } else {
                true
            }
        };
        self.internal.retain(&mut note);
        for list in self.inputs.values_mut() {
            list.retain(&mut note);
        }
        for list in self.outputs.values_mut() {
            list.retain(&mut note);
        }
        self.inputs.retain(|_, list| !list.is_empty());
        self.outputs.retain(|_, list| !list.is_empty());
        for list in self.inter_region.values_mut() {
            list.retain(|id| !ids.contains(id));
        }
        self.inter_region.retain(|_, list| !list.is_empty());
        removed.len()
    }

    /// Forget synapses that are retired or lost an endpoint
    pub fn forget_dead(&mut self) -> usize {
        let dead: AHashSet<SynapseId> = self
            .unique()
            .into_iter()
            .filter(|s| !s.is_alive())
            .map(|s| s.id())
            .collect();
        self.forget(&dead)
    }
}
