// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Activation patterns
//!
//! A pattern decides how a region's neurons advance in one step. Every
//! pattern ends by running each neuron's threshold/refractory state machine,
//! so spikes are reported the same way regardless of pattern.

use std::f32::consts::PI;
use std::sync::Arc;

use hypergraph_npu_neural::{Neuron, SpikeEvent};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionType {
    #[default]
    Cortical,
    Subcortical,
    Brainstem,
    Special,
    Custom,
}

impl std::fmt::Display for RegionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RegionType::Cortical => "cortical",
            RegionType::Subcortical => "subcortical",
            RegionType::Brainstem => "brainstem",
            RegionType::Special => "special",
            RegionType::Custom => "custom",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationPattern {
    #[default]
    Synchronous,
    Asynchronous,
    Layered,
    Competitive,
    Oscillatory,
}

impl std::fmt::Display for ActivationPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivationPattern::Synchronous => "synchronous",
            ActivationPattern::Asynchronous => "asynchronous",
            ActivationPattern::Layered => "layered",
            ActivationPattern::Competitive => "competitive",
            ActivationPattern::Oscillatory => "oscillatory",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ActivationPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "synchronous" | "sync" => Ok(Self::Synchronous),
            "asynchronous" | "async" => Ok(Self::Asynchronous),
            "layered" => Ok(Self::Layered),
            "competitive" => Ok(Self::Competitive),
            "oscillatory" => Ok(Self::Oscillatory),
            other => Err(format!("unknown activation pattern '{}'", other)),
        }
    }
}

/// Probability and size of the synchronous bonus
const SYNC_BONUS_P: f32 = 0.02;
const SYNC_BONUS_RANGE: (f32, f32) = (0.3, 0.7);

const ASYNC_NOISE: f32 = 0.05;
const ASYNC_BURST_P: f32 = 0.015;
const ASYNC_BURST: f32 = 0.4;

const LAYER_SIZE: usize = 8;

const WINNER_GAIN: f32 = 0.1;
const LOSER_DECAY: f32 = 0.95;
const LOSER_FLOOR: f32 = 0.1;
const COMPETITIVE_JOLT_P: f32 = 0.01;
const COMPETITIVE_JOLT: f32 = 0.3;

/// Alpha, beta and gamma bands (Hz), assigned round-robin by neuron index
pub const OSCILLATION_BANDS_HZ: [f32; 3] = [8.0, 15.0, 40.0];
const OSCILLATION_FLOOR: f32 = 0.1;

/// Per-step inputs a pattern needs besides the neurons
pub struct PatternContext<'a> {
    pub dt: f32,
    /// Region clock after this step, milliseconds
    pub now_ms: f64,
    /// Oscillator phase in seconds, owned by the region
    pub phase: f32,
    /// `None` disables every stochastic term
    pub rng: Option<&'a mut StdRng>,
}

/// Advance `neurons` by one step under `pattern`
pub fn advance(
    pattern: ActivationPattern,
    neurons: &[Arc<Neuron>],
    ctx: PatternContext<'_>,
) -> Vec<SpikeEvent> {
    match pattern {
        ActivationPattern::Synchronous => synchronous(neurons, ctx),
        ActivationPattern::Asynchronous => asynchronous(neurons, ctx),
        ActivationPattern::Layered => layered(neurons, ctx),
        ActivationPattern::Competitive => competitive(neurons, ctx),
        ActivationPattern::Oscillatory => oscillatory(neurons, ctx),
    }
}

fn synchronous(neurons: &[Arc<Neuron>], mut ctx: PatternContext<'_>) -> Vec<SpikeEvent> {
    let mut spikes = Vec::new();
    for neuron in neurons {
        if let Some(rng) = ctx.rng.as_deref_mut() {
            if rng.gen::<f32>() < SYNC_BONUS_P {
                let bonus = rng.gen_range(SYNC_BONUS_RANGE.0..=SYNC_BONUS_RANGE.1);
                neuron.modify_activation(|a| a + bonus);
            }
        }
        spikes.extend(neuron.process_at(ctx.dt, ctx.now_ms));
    }
    spikes
}

fn asynchronous(neurons: &[Arc<Neuron>], mut ctx: PatternContext<'_>) -> Vec<SpikeEvent> {
    let mut spikes = Vec::new();
    for neuron in neurons {
        if let Some(rng) = ctx.rng.as_deref_mut() {
            let mut kick = rng.gen_range(-ASYNC_NOISE..=ASYNC_NOISE);
            if rng.gen::<f32>() < ASYNC_BURST_P {
                kick += ASYNC_BURST;
            }
            neuron.modify_activation(|a| a + kick);
        }
        spikes.extend(neuron.process_at(ctx.dt, ctx.now_ms));
    }
    spikes
}

/// Travelling wave `0.2·sin(5t + 0.1·i) + 0.2` added to neuron `i`
pub fn layer_wave(t_s: f32, index: usize) -> f32 {
    0.2 * (5.0 * t_s + 0.1 * index as f32).sin() + 0.2
}

fn layered(neurons: &[Arc<Neuron>], ctx: PatternContext<'_>) -> Vec<SpikeEvent> {
    let t_s = (ctx.now_ms / 1000.0) as f32;
    let mut spikes = Vec::new();
    for (layer, chunk) in neurons.chunks(LAYER_SIZE).enumerate() {
        for (offset, neuron) in chunk.iter().enumerate() {
            let wave = layer_wave(t_s, layer * LAYER_SIZE + offset);
            neuron.modify_activation(|a| a + wave);
            spikes.extend(neuron.process_at(ctx.dt, ctx.now_ms));
        }
    }
    spikes
}

fn competitive(neurons: &[Arc<Neuron>], mut ctx: PatternContext<'_>) -> Vec<SpikeEvent> {
    let activations: Vec<f32> = neurons.iter().map(|n| n.activation()).collect();
    let winner = activations
        .iter()
        .enumerate()
        .fold(None::<(usize, f32)>, |best, (i, &a)| match best {
            Some((_, b)) if b >= a => best,
            _ => Some((i, a)),
        })
        .map(|(i, _)| i);

    let mut spikes = Vec::new();
    for (i, neuron) in neurons.iter().enumerate() {
        if Some(i) == winner {
            neuron.modify_activation(|a| a + WINNER_GAIN * ctx.dt);
        } else {
            neuron.modify_activation(|a| (a * LOSER_DECAY).max(LOSER_FLOOR));
        }
        if let Some(rng) = ctx.rng.as_deref_mut() {
            if rng.gen::<f32>() < COMPETITIVE_JOLT_P {
                neuron.modify_activation(|a| a + COMPETITIVE_JOLT);
            }
        }
        spikes.extend(neuron.fire_check(ctx.dt, ctx.now_ms));
    }
    spikes
}

/// Band modulation in `[0, 1]` for the neuron at `index`
pub fn band_modulation(phase_s: f32, index: usize) -> f32 {
    let freq = OSCILLATION_BANDS_HZ[index % OSCILLATION_BANDS_HZ.len()];
    0.5 + 0.5 * (2.0 * PI * freq * phase_s).sin()
}

fn oscillatory(neurons: &[Arc<Neuron>], ctx: PatternContext<'_>) -> Vec<SpikeEvent> {
    let mut spikes = Vec::new();
    for (i, neuron) in neurons.iter().enumerate() {
        let m = band_modulation(ctx.phase, i);
        neuron.modify_activation(|a| (a * m).max(OSCILLATION_FLOOR));
        spikes.extend(neuron.process_at(ctx.dt, ctx.now_ms));
    }
    spikes
}
