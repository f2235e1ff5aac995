// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Hippocampus: place cells and an episodic buffer with pattern completion
//!
//! Place-field centres are laid out on the unit square by a golden-ratio
//! sequence over neuron index, so they stay stable as neurons are added.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;

use hypergraph_npu_neural::Neuron;
use hypergraph_npu_region_engine::{ActivationPattern, Region, RegionBehavior, RegionBuilder, RegionType};
use serde_json::{json, Value};

use super::{activations, cosine, mean_activation, with_variant};

pub const KEY: &str = "hippocampus";

const GOLDEN: f32 = 0.618_034;
/// Episodes at least this similar to a stored one are not stored again
const DUPLICATE_SIMILARITY: f32 = 0.95;

/// Place-field centre of neuron `index`
pub fn place_field_center(index: usize) -> [f32; 2] {
    let i = index as f32 + 1.0;
    [(i * GOLDEN).fract(), (i * GOLDEN * GOLDEN).fract()]
}

#[derive(Debug, Clone)]
pub struct Hippocampus {
    pub place_field_width: f32,
    /// Drive at the field centre, per second
    pub place_gain: f32,
    pub episode_capacity: usize,
    pub encode_threshold: f32,
    pub completion_threshold: f32,
    /// Per-second pull toward a recalled episode
    pub completion_rate: f32,
    position: Option<[f32; 2]>,
    episodes: VecDeque<Vec<f32>>,
    last_recall: Option<usize>,
}

impl Default for Hippocampus {
    fn default() -> Self {
        Self {
            place_field_width: 0.1,
            place_gain: 2.0,
            episode_capacity: 32,
            encode_threshold: 0.5,
            completion_threshold: 0.7,
            completion_rate: 2.0,
            position: None,
            episodes: VecDeque::new(),
            last_recall: None,
        }
    }
}

impl Hippocampus {
    pub fn set_position(&mut self, position: Option<[f32; 2]>) {
        self.position = position.filter(|p| p.iter().all(|c| c.is_finite()));
    }

    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }

    /// Index of the episode recalled in the last step
    pub fn last_recall(&self) -> Option<usize> {
        self.last_recall
    }

    fn drive_place_cells(&self, neurons: &[Arc<Neuron>], dt: f32) {
        let Some([x, y]) = self.position else {
            return;
        };
        let two_sigma_sq = 2.0 * self.place_field_width.max(1e-3).powi(2);
        for (i, n) in neurons.iter().enumerate() {
            let [cx, cy] = place_field_center(i);
            let d2 = (x - cx).powi(2) + (y - cy).powi(2);
            let drive = self.place_gain * (-d2 / two_sigma_sq).exp() * dt;
            n.modify_activation(|a| a + drive);
        }
    }

    fn best_match(&self, pattern: &[f32]) -> Option<(usize, f32)> {
        self.episodes
            .iter()
            .enumerate()
            .map(|(i, ep)| (i, cosine(pattern, ep)))
            .fold(None, |best, (i, s)| match best {
                Some((_, b)) if b >= s => best,
                _ => Some((i, s)),
            })
    }

    fn encode(&mut self, pattern: Vec<f32>) {
        if self.episode_capacity == 0 {
            return;
        }
        if self
            .best_match(&pattern)
            .is_some_and(|(_, s)| s >= DUPLICATE_SIMILARITY)
        {
            return;
        }
        if self.episodes.len() == self.episode_capacity {
            self.episodes.pop_front();
        }
        self.episodes.push_back(pattern);
    }
}

impl RegionBehavior for Hippocampus {
    fn kind(&self) -> &'static str {
        KEY
    }

    fn per_step_hook(&mut self, _region: &Region, neurons: &[Arc<Neuron>], dt: f32) {
        self.drive_place_cells(neurons, dt);

        let pattern = activations(neurons);
        self.last_recall = None;
        if let Some((i, s)) = self.best_match(&pattern) {
            if s >= self.completion_threshold && s < DUPLICATE_SIMILARITY {
                let k = (self.completion_rate * dt).clamp(0.0, 1.0);
                for (n, target) in neurons.iter().zip(&self.episodes[i]) {
                    n.modify_activation(|a| a + k * (target - a));
                }
                self.last_recall = Some(i);
            }
        }

        if mean_activation(neurons) >= self.encode_threshold {
            self.encode(activations(neurons));
        }
    }

    fn snapshot(&self) -> Value {
        json!({
            "position": self.position,
            "episodes": self.episodes.len(),
            "last_recall": self.last_recall,
        })
    }

    fn reset(&mut self) {
        self.position = None;
        self.episodes.clear();
        self.last_recall = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Move the animal for a hippocampus region; `false` for other regions
pub fn set_position(region: &Region, x: f32, y: f32) -> bool {
    with_variant(region, |h: &mut Hippocampus| h.set_position(Some([x, y]))).is_some()
}

pub fn build(name: &str, neuron_count: usize) -> Arc<Region> {
    RegionBuilder::new(name)
        .region_type(RegionType::Subcortical)
        .pattern(ActivationPattern::Oscillatory)
        .neurons(neuron_count)
        .behavior(Box::new(Hippocampus::default()))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_cell_fires_near_centre() {
        let region = build("hpc", 10);
        let neurons = region.neurons();
        let mut h = Hippocampus::default();
        let [cx, cy] = place_field_center(3);
        h.set_position(Some([cx, cy]));
        h.drive_place_cells(&neurons, 0.1);
        let at_centre = neurons[3].activation();
        assert!((at_centre - 0.2).abs() < 1e-5);
        assert!(neurons.iter().all(|n| n.activation() <= at_centre + 1e-6));
    }

    #[test]
    fn test_pattern_completion() {
        let region = build("hpc", 4);
        let neurons = region.neurons();
        let mut h = Hippocampus::default();
        h.encode(vec![1.0, 1.0, 0.0, 0.0]);

        // Partial cue: one of the two stored units
        neurons[0].set_activation(1.0);
        neurons[1].set_activation(0.2);
        h.per_step_hook(&region, &neurons, 0.1);
        assert_eq!(h.last_recall(), Some(0));
        assert!((neurons[1].activation() - 0.36).abs() < 1e-5);
    }

    #[test]
    fn test_buffer_bounded_and_deduplicated() {
        let mut h = Hippocampus {
            episode_capacity: 2,
            ..Default::default()
        };
        h.encode(vec![1.0, 0.0, 0.0]);
        h.encode(vec![1.0, 0.0, 0.0]);
        assert_eq!(h.episode_count(), 1);
        h.encode(vec![0.0, 1.0, 0.0]);
        h.encode(vec![0.0, 0.0, 1.0]);
        assert_eq!(h.episode_count(), 2);
    }
}
