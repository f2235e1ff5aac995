// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Intrinsic motivation
//!
//! Turns a stream of prediction errors into an intrinsic reward made of
//! three parts: the error itself, surprise (how far the error sits above
//! its recent mean, in standard deviations) and uncertainty (spread of the
//! recent errors). History statistics weight older entries by `decay^age`.

use std::collections::VecDeque;

use hypergraph_config::IntrinsicMotivationConfig;
use serde::{Deserialize, Serialize};

/// Standard deviations that map to full surprise
const SURPRISE_SIGMAS: f32 = 3.0;
const MIN_SPREAD: f32 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicSignal {
    pub prediction_error: f32,
    pub surprise: f32,
    pub uncertainty: f32,
    /// Weighted sum in `[0, 1]`
    pub reward: f32,
}

#[derive(Debug, Clone)]
pub struct IntrinsicMotivation {
    config: IntrinsicMotivationConfig,
    history: VecDeque<f32>,
    last: IntrinsicSignal,
}

impl IntrinsicMotivation {
    pub fn new(config: IntrinsicMotivationConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_length.max(1)),
            config,
            last: IntrinsicSignal::default(),
        }
    }

    pub fn set_config(&mut self, config: IntrinsicMotivationConfig) {
        self.config = config;
        self.trim();
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn last_signal(&self) -> IntrinsicSignal {
        self.last
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.last = IntrinsicSignal::default();
    }

    /// Decay-weighted mean and variance of the history
    fn weighted_stats(&self) -> (f32, f32) {
        let decay = if self.config.decay.is_finite() {
            self.config.decay.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let mut weight = 1.0f32;
        let (mut sum_w, mut sum_x, mut sum_xx) = (0.0f32, 0.0f32, 0.0f32);
        for &x in self.history.iter().rev() {
            sum_w += weight;
            sum_x += weight * x;
            sum_xx += weight * x * x;
            weight *= decay;
        }
        if sum_w <= 0.0 {
            return (0.0, 0.0);
        }
        let mean = sum_x / sum_w;
        let var = (sum_xx / sum_w - mean * mean).max(0.0);
        (mean, var)
    }

    fn trim(&mut self) {
        let cap = self.config.history_length.max(1);
        while self.history.len() > cap {
            self.history.pop_front();
        }
    }

    /// Score one prediction error and add it to the history
    ///
    /// Disabled instances return a zero signal and record nothing.
    pub fn observe(&mut self, prediction_error: f32) -> IntrinsicSignal {
        if !self.config.enabled {
            return IntrinsicSignal::default();
        }
        let err = if prediction_error.is_finite() {
            prediction_error.max(0.0)
        } else {
            0.0
        };

        let (mean, var) = self.weighted_stats();
        let spread = var.sqrt();
        let surprise = if self.history.len() >= 2 && spread > MIN_SPREAD {
            ((err - mean) / spread / SURPRISE_SIGMAS).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let uncertainty = spread.min(1.0);
        let pe = err.min(1.0);

        let reward = (self.config.uncertainty_weight * uncertainty
            + self.config.surprise_weight * surprise
            + self.config.prediction_error_weight * pe)
            .clamp(0.0, 1.0);

        self.history.push_back(err);
        self.trim();

        self.last = IntrinsicSignal {
            prediction_error: err,
            surprise,
            uncertainty,
            reward,
        };
        self.last
    }

    /// Root-mean-square error between a prediction and what happened
    pub fn observe_vectors(&mut self, predicted: &[f32], actual: &[f32]) -> IntrinsicSignal {
        let n = predicted.len().min(actual.len());
        let err = if n == 0 {
            0.0
        } else {
            let sq: f32 = predicted
                .iter()
                .zip(actual)
                .map(|(p, a)| (p - a) * (p - a))
                .sum();
            (sq / n as f32).sqrt()
        };
        self.observe(err)
    }
}
