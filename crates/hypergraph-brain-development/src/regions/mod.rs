// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Specialised regions
//!
//! Each module pairs a [`RegionBehavior`] with a `build(name, n)` factory
//! that picks the region type and activation pattern. The behaviors only
//! touch activations of member neurons, so every generic region invariant
//! still holds.
//!
//! [`RegionBehavior`]: hypergraph_npu_region_engine::RegionBehavior

use std::ops::Range;
use std::sync::Arc;

use hypergraph_npu_neural::Neuron;
use hypergraph_npu_region_engine::{Region, RegionBehavior};
use tracing::warn;

use crate::registry::RegionRegistry;

pub mod amygdala;
pub mod auditory;
pub mod brainstem;
pub mod hippocampus;
pub mod motor;
pub mod prefrontal;
pub mod somatosensory;
pub mod thalamus;
pub mod visual;

pub use amygdala::Amygdala;
pub use auditory::AuditoryCortex;
pub use brainstem::Brainstem;
pub use hippocampus::Hippocampus;
pub use motor::MotorCortex;
pub use prefrontal::PrefrontalCortex;
pub use somatosensory::SomatosensoryCortex;
pub use thalamus::Thalamus;
pub use visual::VisualCortex;

type Builder = fn(&str, usize) -> Arc<Region>;

const BUILTIN: [(&str, Builder); 9] = [
    (visual::KEY, visual::build),
    (auditory::KEY, auditory::build),
    (motor::KEY, motor::build),
    (prefrontal::KEY, prefrontal::build),
    (somatosensory::KEY, somatosensory::build),
    (hippocampus::KEY, hippocampus::build),
    (amygdala::KEY, amygdala::build),
    (thalamus::KEY, thalamus::build),
    (brainstem::KEY, brainstem::build),
];

const BUILTIN_ALIASES: [(&str, &str); 5] = [
    ("v1", visual::KEY),
    ("pfc", prefrontal::KEY),
    ("a1", auditory::KEY),
    ("m1", motor::KEY),
    ("s1", somatosensory::KEY),
];

pub(crate) fn register_builtin(registry: &RegionRegistry) {
    for (key, build) in BUILTIN {
        if let Err(e) = registry.register_factory(key, build) {
            warn!(target: "registry", key, error = %e, "builtin region not registered");
        }
    }
    for (alias, key) in BUILTIN_ALIASES {
        if let Err(e) = registry.register_alias(alias, key) {
            warn!(target: "registry", alias, error = %e, "builtin alias not registered");
        }
    }
}

/// Run `f` on the behavior of `region` if it is a `T`
pub fn with_variant<T, R>(region: &Region, f: impl FnOnce(&mut T) -> R) -> Option<R>
where
    T: RegionBehavior + 'static,
{
    region
        .with_behavior(|b| b.as_any_mut().downcast_mut::<T>().map(f))
        .flatten()
}

/// `parts` contiguous, near-equal ranges covering `0..len`
pub(crate) fn partition(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    (0..parts)
        .map(|i| (i * len / parts)..((i + 1) * len / parts))
        .collect()
}

pub(crate) fn mean_activation(neurons: &[Arc<Neuron>]) -> f32 {
    if neurons.is_empty() {
        return 0.0;
    }
    neurons.iter().map(|n| n.activation()).sum::<f32>() / neurons.len() as f32
}

pub(crate) fn activations(neurons: &[Arc<Neuron>]) -> Vec<f32> {
    neurons.iter().map(|n| n.activation()).collect()
}

/// Cosine similarity; 0 when either side is zero or lengths differ
pub(crate) fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 0.0;
    }
    dot / (na * nb)
}
