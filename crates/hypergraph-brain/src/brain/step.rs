// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Step loop

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hypergraph_config::ProcessingMode;
use hypergraph_npu_region_engine::{Region, RegionStepReport};
use rayon::prelude::*;
use tracing::trace;

use super::HypergraphBrain;

/// What one [`HypergraphBrain::process_step`] call did
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Brain step number; unchanged when the brain is shut down
    pub step: u64,
    /// One entry per region, in processing order
    pub regions: Vec<RegionStepReport>,
    pub spike_count: usize,
    pub elapsed: Duration,
}

impl StepReport {
    fn idle(step: u64) -> Self {
        Self {
            step,
            regions: Vec::new(),
            spike_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.regions.is_empty()
    }
}

fn run_regions(regions: &[Arc<Region>], dt: f32, mode: ProcessingMode) -> Vec<RegionStepReport> {
    match mode {
        ProcessingMode::Sequential => regions.iter().map(|r| r.process(dt)).collect(),
        ProcessingMode::Parallel => regions.par_iter().map(|r| r.process(dt)).collect(),
    }
}

impl HypergraphBrain {
    /// Advance every region by `dt` seconds, then run one learning step
    ///
    /// A shut-down brain returns an idle report and changes nothing.
    pub fn process_step(&self, dt: f32) -> StepReport {
        if !self.is_active() {
            return StepReport::idle(self.steps());
        }
        let started = Instant::now();
        let step = self.step.fetch_add(1, Ordering::AcqRel) + 1;
        let regions = self.regions();

        let reports = run_regions(&regions, dt, self.processing_mode());

        let auto_eligibility = self.learning.config().reward.auto_eligibility;
        let mut spike_count = 0;
        for (region, report) in regions.iter().zip(&reports) {
            spike_count += report.spikes.len();
            for spike in &report.spikes {
                self.learning.record_spike(spike);
                if auto_eligibility {
                    if let Some(neuron) = region.neuron(spike.neuron_id) {
                        self.learning.on_neuron_spike(&neuron);
                    }
                }
            }
        }

        self.learning.update_learning(dt, &regions);

        let elapsed = started.elapsed();
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.step_hz.store((1.0 / secs).to_bits(), Ordering::Relaxed);
        }
        trace!(target: "brain", step, regions = regions.len(), spikes = spike_count, ?elapsed, "step");

        self.publish_periodic(step);

        StepReport {
            step,
            regions: reports,
            spike_count,
            elapsed,
        }
    }

    /// Run `steps` consecutive steps; returns the total spike count
    pub fn run_steps(&self, steps: usize, dt: f32) -> usize {
        (0..steps).map(|_| self.process_step(dt).spike_count).sum()
    }

    /// Steps per second measured over the last step
    pub fn step_hz(&self) -> f64 {
        f64::from_bits(self.step_hz.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypergraph_config::HypergraphConfig;
    use hypergraph_npu_region_engine::{ActivationPattern, RegionType};

    fn quiet_config() -> HypergraphConfig {
        let mut config = HypergraphConfig::default();
        config.region.exploration_noise = false;
        config.learning.hebbian_rate = 0.0;
        config.learning.stdp_rate = 0.0;
        config
    }

    #[test]
    fn test_empty_brain_steps() {
        let brain = HypergraphBrain::new(quiet_config());
        let report = brain.process_step(0.01);
        assert_eq!(report.step, 1);
        assert!(report.regions.is_empty());
        assert_eq!(brain.learning().steps(), 1);
    }

    #[test]
    fn test_reports_follow_processing_order() {
        let brain = HypergraphBrain::new(quiet_config());
        let a = brain
            .create_region("a", 3, RegionType::Cortical, ActivationPattern::Synchronous)
            .unwrap();
        let b = brain
            .create_region("b", 3, RegionType::Cortical, ActivationPattern::Asynchronous)
            .unwrap();
        let report = brain.process_step(0.01);
        assert_eq!(report.regions.len(), 2);
        assert_eq!(report.regions[0].region_id, a.id());
        assert_eq!(report.regions[1].region_id, b.id());
        assert_eq!(a.processing_cycles(), 1);
        assert_eq!(b.processing_cycles(), 1);
    }

    #[test]
    fn test_shut_down_brain_is_idle() {
        let brain = HypergraphBrain::new(quiet_config());
        let region = brain
            .create_region("r", 2, RegionType::Cortical, ActivationPattern::Synchronous)
            .unwrap();
        brain.process_step(0.01);
        brain.shutdown();
        let report = brain.process_step(0.01);
        assert!(report.is_idle());
        assert_eq!(report.step, 1);
        assert_eq!(region.processing_cycles(), 1);
    }
}
