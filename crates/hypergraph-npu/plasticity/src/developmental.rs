// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Developmental gating
//!
//! An embedder may install a [`DevelopmentalModulator`] that scales or
//! blocks learning per region and per kind of update, e.g. to model
//! critical periods. The learning system only consumes the answers.

use serde::{Deserialize, Serialize};

/// Kind of update being gated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningKind {
    Hebbian,
    Stdp,
    Reward,
    Homeostasis,
    Structural,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningModulation {
    pub lr_mult: f32,
    pub plasticity_mult: f32,
    /// Skip the update entirely for this region and kind
    pub is_restricted: bool,
}

impl Default for LearningModulation {
    fn default() -> Self {
        Self {
            lr_mult: 1.0,
            plasticity_mult: 1.0,
            is_restricted: false,
        }
    }
}

impl LearningModulation {
    /// Combined multiplier, or `None` when restricted
    pub fn scale(&self) -> Option<f32> {
        if self.is_restricted {
            return None;
        }
        let s = self.lr_mult * self.plasticity_mult;
        Some(if s.is_finite() { s.max(0.0) } else { 0.0 })
    }
}

pub trait DevelopmentalModulator: Send + Sync {
    /// `None` means no opinion, i.e. unit modulation
    fn learning_modulation(&self, kind: LearningKind, region_name: &str) -> Option<LearningModulation>;
}
