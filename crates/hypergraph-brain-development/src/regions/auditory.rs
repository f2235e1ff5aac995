// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Auditory cortex: tonotopic frequency bands

use std::any::Any;
use std::sync::Arc;

use hypergraph_npu_neural::Neuron;
use hypergraph_npu_region_engine::{ActivationPattern, Region, RegionBehavior, RegionBuilder, RegionType};
use serde_json::{json, Value};

use super::{mean_activation, partition};

pub const KEY: &str = "auditory_cortex";

#[derive(Debug, Clone)]
pub struct AuditoryCortex {
    pub bands: usize,
    /// Per-second blend toward the neighbouring bands
    pub spread: f32,
    band_energy: Vec<f32>,
}

impl Default for AuditoryCortex {
    fn default() -> Self {
        Self::with_bands(8)
    }
}

impl AuditoryCortex {
    pub fn with_bands(bands: usize) -> Self {
        let bands = bands.max(1);
        Self {
            bands,
            spread: 1.0,
            band_energy: vec![0.0; bands],
        }
    }

    /// Mean activation per band, lowest frequency first
    pub fn band_energy(&self) -> &[f32] {
        &self.band_energy
    }

    /// Index of the loudest band
    pub fn dominant_band(&self) -> Option<usize> {
        self.band_energy
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, &e)| match best {
                Some((_, b)) if b >= e => best,
                _ => Some((i, e)),
            })
            .filter(|(_, e)| *e > 0.0)
            .map(|(i, _)| i)
    }

    /// Drive each band's neurons with one spectrum bin
    ///
    /// Bins beyond the band count are ignored; returns the bins used.
    pub fn feed_spectrum(&self, region: &Region, spectrum: &[f32]) -> usize {
        let neurons = region.neurons();
        let mut used = 0;
        for (range, level) in partition(neurons.len(), self.bands).into_iter().zip(spectrum) {
            for n in &neurons[range] {
                n.set_activation(*level);
            }
            used += 1;
        }
        used
    }
}

impl RegionBehavior for AuditoryCortex {
    fn kind(&self) -> &'static str {
        KEY
    }

    fn per_step_hook(&mut self, _region: &Region, neurons: &[Arc<Neuron>], dt: f32) {
        let ranges = partition(neurons.len(), self.bands);
        let before: Vec<f32> = ranges.iter().map(|r| mean_activation(&neurons[r.clone()])).collect();
        let blend = (self.spread * dt).clamp(0.0, 1.0);

        for (b, range) in ranges.iter().enumerate() {
            let lo = if b > 0 { before[b - 1] } else { before[b] };
            let hi = before.get(b + 1).copied().unwrap_or(before[b]);
            let neighbours = 0.5 * (lo + hi);
            for n in &neurons[range.clone()] {
                n.modify_activation(|a| a + blend * (neighbours - a) * 0.5);
            }
        }
        self.band_energy = ranges.into_iter().map(|r| mean_activation(&neurons[r])).collect();
    }

    fn snapshot(&self) -> Value {
        json!({ "band_energy": self.band_energy, "dominant_band": self.dominant_band() })
    }

    fn reset(&mut self) {
        self.band_energy = vec![0.0; self.bands];
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub fn build(name: &str, neuron_count: usize) -> Arc<Region> {
    RegionBuilder::new(name)
        .region_type(RegionType::Cortical)
        .pattern(ActivationPattern::Oscillatory)
        .neurons(neuron_count)
        .behavior(Box::new(AuditoryCortex::default()))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectrum_and_dominant_band() {
        let region = build("a", 16);
        let mut ac = AuditoryCortex::with_bands(4);
        assert_eq!(ac.feed_spectrum(&region, &[0.1, 0.9, 0.2, 0.0, 0.7]), 4);
        ac.per_step_hook(&region, &region.neurons(), 0.0);
        assert_eq!(ac.dominant_band(), Some(1));
        assert!((ac.band_energy()[1] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_spread_leaks_into_neighbours() {
        let region = build("a", 8);
        let mut ac = AuditoryCortex::with_bands(4);
        ac.feed_spectrum(&region, &[0.0, 1.0, 0.0, 0.0]);
        ac.per_step_hook(&region, &region.neurons(), 0.1);
        let e = ac.band_energy();
        assert!(e[0] > 0.0 && e[2] > 0.0);
        assert!(e[1] < 1.0);
        assert_eq!(e[3], 0.0);
    }
}
