// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Topology changes: wiring, pruning, growth and neuron removal

use std::sync::{Arc, Weak};

use ahash::AHashSet;
use hypergraph_npu_neural::{Neuron, NeuronId, RegionId, Synapse, SynapseId, SynapseType};
use parking_lot::MutexGuard;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use super::connections::Connections;
use super::Region;

/// Active neurons considered per growth pass
const GROW_CANDIDATE_CAP: usize = 128;

/// Connection tables of a region and all its live peers, locked in
/// ascending region-id order
struct LinkedConnections<'a> {
    guards: Vec<(RegionId, MutexGuard<'a, Connections>)>,
    own: usize,
}

impl LinkedConnections<'_> {
    fn own(&self) -> &Connections {
        &self.guards[self.own].1
    }

    /// Forget `ids` everywhere; returns the count found in the own table
    fn forget(&mut self, ids: &AHashSet<SynapseId>) -> usize {
        let own = self.own;
        let mut found = 0;
        for (i, (_, conns)) in self.guards.iter_mut().enumerate() {
            let n = conns.forget(ids);
            if i == own {
                found = n;
            }
        }
        found
    }
}

impl Region {
    /// Remember `peer` on both sides
    fn link_peer(&self, peer: &Region) {
        self.peers.lock().insert(peer.id, Weak::clone(&peer.this));
        peer.peers.lock().insert(self.id, Weak::clone(&self.this));
    }

    /// Live peers; dropped regions are forgotten
    fn live_peers(&self) -> Vec<Arc<Region>> {
        let mut peers = self.peers.lock();
        peers.retain(|_, w| w.strong_count() > 0);
        peers.values().filter_map(Weak::upgrade).collect()
    }

    fn lock_linked<'a>(&'a self, peers: &'a [Arc<Region>]) -> LinkedConnections<'a> {
        let mut order: Vec<&Region> = peers.iter().map(|p| p.as_ref()).collect();
        order.push(self);
        order.sort_by_key(|r| r.id);
        order.dedup_by_key(|r| r.id);
        let guards: Vec<_> = order.into_iter().map(|r| (r.id, r.connections.lock())).collect();
        let own = guards.iter().position(|(id, _)| *id == self.id).unwrap_or(0);
        LinkedConnections { guards, own }
    }

    /// Attach both ends of a fresh candidate, or return the existing edge
    fn attach_edge(
        &self,
        source: &Arc<Neuron>,
        target: &Arc<Neuron>,
        weight: f32,
        kind: SynapseType,
    ) -> Option<(Arc<Synapse>, bool)> {
        let candidate = Synapse::new(source, target, weight, kind, self.bounds);
        let (synapse, fresh) = match source.attach_output_unique(&candidate) {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "region", region = %self.name, error = %e, "rejected synapse");
                return None;
            }
        };
        if !fresh {
            return Some((synapse, false));
        }
        if let Err(e) = target.add_input_synapse(&synapse) {
            source.remove_output_synapse(synapse.id());
            synapse.retire();
            warn!(target: "region", region = %self.name, error = %e, "rejected synapse");
            return None;
        }
        Some((synapse, true))
    }

    /// Connect two member neurons; idempotent per ordered pair
    ///
    /// Returns `None` unless both endpoints belong to this region.
    pub fn connect_neurons(
        &self,
        source: NeuronId,
        target: NeuronId,
        weight: f32,
        kind: SynapseType,
    ) -> Option<Arc<Synapse>> {
        self.connect_neurons_inner(source, target, weight, kind)
            .map(|(s, _)| s)
    }

    fn connect_neurons_inner(
        &self,
        source: NeuronId,
        target: NeuronId,
        weight: f32,
        kind: SynapseType,
    ) -> Option<(Arc<Synapse>, bool)> {
        let src = self.neuron(source)?;
        let tgt = self.neuron(target)?;
        let (synapse, fresh) = self.attach_edge(&src, &tgt, weight, kind)?;
        if fresh {
            self.connections.lock().internal.push(Arc::clone(&synapse));
        }
        Some((synapse, fresh))
    }

    /// Register a pre-built synapse between two members
    ///
    /// Attaches it to both neurons if needed. Returns `false` when an endpoint
    /// is foreign, the synapse is retired, or it is already registered.
    pub fn add_internal_synapse(&self, synapse: &Arc<Synapse>) -> bool {
        if synapse.is_retired() {
            return false;
        }
        let Some((src, tgt)) = synapse.endpoints() else {
            return false;
        };
        if !self.contains_neuron(src.id()) || !self.contains_neuron(tgt.id()) {
            return false;
        }
        if src.add_output_synapse(synapse).is_err() || tgt.add_input_synapse(synapse).is_err() {
            return false;
        }
        let mut conns = self.connections.lock();
        if conns.internal.iter().any(|s| s.id() == synapse.id()) {
            return false;
        }
        conns.internal.push(Arc::clone(synapse));
        true
    }

    /// Connect a member neuron to a neuron of `peer`
    ///
    /// Idempotent per ordered pair: an existing edge is returned unchanged.
    /// The new synapse is filed in this region's output map and
    /// inter-region map and in `peer`'s input map. Both connection mutexes
    /// are taken in ascending region-id order.
    pub fn connect_to_region(
        &self,
        peer: &Region,
        source: NeuronId,
        target: NeuronId,
        weight: f32,
        kind: SynapseType,
    ) -> Option<Arc<Synapse>> {
        if peer.id == self.id {
            return self.connect_neurons(source, target, weight, kind);
        }
        let src = self.neuron(source)?;
        let tgt = peer.neuron(target)?;
        let (synapse, fresh) = self.attach_edge(&src, &tgt, weight, kind)?;
        if !fresh {
            return Some(synapse);
        }

        let (mut low, mut high) = if self.id < peer.id {
            (self.connections.lock(), peer.connections.lock())
        } else {
            (peer.connections.lock(), self.connections.lock())
        };
        let (mine, theirs) = if self.id < peer.id {
            (&mut *low, &mut *high)
        } else {
            (&mut *high, &mut *low)
        };
        mine.outputs
            .entry(source)
            .or_default()
            .push(Arc::clone(&synapse));
        mine.inter_region
            .entry(peer.id)
            .or_default()
            .push(synapse.id());
        theirs
            .inputs
            .entry(target)
            .or_default()
            .push(Arc::clone(&synapse));
        drop(high);
        drop(low);
        self.link_peer(peer);

        debug!(
            target: "region",
            from = %self.name,
            to = %peer.name,
            synapse = %synapse.id(),
            "connected regions"
        );
        Some(synapse)
    }

    /// Remove a member neuron and every synapse touching it
    ///
    /// Detached synapses are retired and dropped from the maps of this
    /// region and every peer region.
    pub fn remove_neuron(&self, id: NeuronId) -> bool {
        let Some(neuron) = self.population.lock().remove(id) else {
            return false;
        };

        let detached = neuron.detach_all();
        let mut ids = AHashSet::with_capacity(detached.len());
        for synapse in &detached {
            synapse.retire();
            ids.insert(synapse.id());
            if synapse.source_id() == id {
                if let Some(t) = synapse.target() {
                    t.remove_input_synapse(synapse.id());
                }
            }
            if synapse.target_id() == id {
                if let Some(s) = synapse.source() {
                    s.remove_output_synapse(synapse.id());
                }
            }
        }
        let peers = self.live_peers();
        self.lock_linked(&peers).forget(&ids);

        debug!(target: "region", region = %self.name, neuron = %id, synapses = ids.len(), "removed neuron");
        true
    }

    /// Drop references to retired synapses and ones with a dead endpoint
    pub fn purge_dead_synapses(&self) -> usize {
        for neuron in self.neurons() {
            neuron.retain_live_synapses();
        }
        self.connections.lock().forget_dead()
    }

    /// Remove every touching synapse with `|w| < threshold`
    ///
    /// Map entries are dropped from this region and every peer region under
    /// one hold of their connection mutexes, then the synapses are retired
    /// and detached from their endpoints.
    pub fn prune_weak_synapses(&self, threshold: f32) -> usize {
        if !threshold.is_finite() || threshold <= 0.0 {
            return 0;
        }
        let peers = self.live_peers();
        let victims: Vec<Arc<Synapse>> = {
            let mut conns = self.lock_linked(&peers);
            let victims: Vec<Arc<Synapse>> = conns
                .own()
                .unique()
                .into_iter()
                .filter(|s| s.weight().abs() < threshold)
                .collect();
            let ids: AHashSet<SynapseId> = victims.iter().map(|s| s.id()).collect();
            conns.forget(&ids);
            for s in &victims {
                s.retire();
            }
            victims
        };

        for synapse in &victims {
            if let Some(s) = synapse.source() {
                s.remove_output_synapse(synapse.id());
            }
            if let Some(t) = synapse.target() {
                t.remove_input_synapse(synapse.id());
            }
        }
        if !victims.is_empty() {
            debug!(target: "region", region = %self.name, pruned = victims.len(), threshold, "pruned synapses");
        }
        victims.len()
    }

    /// Add up to `max_new` internal synapses between active neurons
    ///
    /// Neurons with activation ≥ `min_activation` are paired in random order;
    /// ordered pairs that already have an edge are skipped.
    pub fn grow_synapses(
        &self,
        max_new: usize,
        min_activation: f32,
        initial_weight: f32,
        kind: SynapseType,
    ) -> usize {
        if max_new == 0 {
            return 0;
        }
        let mut active: Vec<Arc<Neuron>> = self
            .neurons()
            .into_iter()
            .filter(|n| n.activation() >= min_activation)
            .collect();
        if active.len() < 2 {
            return 0;
        }

        let pairs = {
            let mut rt = self.runtime.lock();
            active.shuffle(&mut rt.structural_rng);
            active.truncate(GROW_CANDIDATE_CAP);
            let mut pairs: Vec<(usize, usize)> = (0..active.len())
                .flat_map(|i| (0..active.len()).map(move |j| (i, j)))
                .filter(|(i, j)| i != j)
                .collect();
            pairs.shuffle(&mut rt.structural_rng);
            pairs
        };

        let mut grown = 0;
        for (i, j) in pairs {
            if grown == max_new {
                break;
            }
            let (src, tgt) = (&active[i], &active[j]);
            if src.output_to(tgt.id()).is_some() {
                continue;
            }
            if let Some((_, true)) = self.connect_neurons_inner(src.id(), tgt.id(), initial_weight, kind) {
                grown += 1;
            }
        }
        if grown > 0 {
            debug!(target: "region", region = %self.name, grown, "grew synapses");
        }
        grown
    }
}
