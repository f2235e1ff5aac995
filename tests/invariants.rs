// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Quantified invariants under random driving of a whole brain

use std::sync::Arc;

use hypergraph::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Drive {
    Feed(Vec<f32>),
    Reward(f32),
    Neuromodulate(f32),
    Attention(f32),
    Step(f32),
}

fn drive() -> impl Strategy<Value = Drive> {
    prop_oneof![
        proptest::collection::vec(-0.5f32..1.5, 0..24).prop_map(Drive::Feed),
        (-10.0f32..10.0).prop_map(Drive::Reward),
        (-3.0f32..3.0).prop_map(Drive::Neuromodulate),
        (0.0f32..10.0).prop_map(Drive::Attention),
        (0.0f32..0.05).prop_map(Drive::Step),
    ]
}

fn brain(seed: u64, parallel: bool) -> (HypergraphBrain, Vec<Arc<Region>>) {
    let mut config = HypergraphConfig::default();
    config.brain.seed = seed;
    config.brain.processing_mode = if parallel {
        ProcessingMode::Parallel
    } else {
        ProcessingMode::Sequential
    };
    config.learning.hebbian_rate = 0.2;
    config.learning.stdp_rate = 0.05;
    config.learning.p_gate = 0.5;
    config.learning.consolidation_interval = 0.05;
    config.learning.reward.auto_eligibility = true;
    config.learning.structural.enabled = true;
    config.learning.structural.interval_steps = 5;
    let brain = HypergraphBrain::new(config);

    let sensory = brain
        .create_region("sensory", 16, RegionType::Cortical, ActivationPattern::Layered)
        .unwrap();
    let assoc = brain.add_region_from_registry("hippocampus", "memory", 12).unwrap();
    let motor = brain
        .create_region("motor", 8, RegionType::Cortical, ActivationPattern::Competitive)
        .unwrap();
    brain.map_modality("input", "sensory").unwrap();
    brain.map_modality("output", "motor").unwrap();

    for (src, tgt) in [(&sensory, &assoc), (&assoc, &motor), (&motor, &sensory)] {
        for (i, a) in src.neuron_ids().iter().enumerate().take(6) {
            let b = tgt.neuron_ids()[i % tgt.neuron_count()];
            brain
                .connect(src.name(), *a, tgt.name(), b, 0.4, SynapseType::Excitatory)
                .unwrap();
        }
    }
    (brain, vec![sensory, assoc, motor])
}

fn assert_bounds(brain: &HypergraphBrain, regions: &[Arc<Region>]) -> Result<(), TestCaseError> {
    brain.check_invariants().map_err(TestCaseError::fail)?;
    for region in regions {
        prop_assert_eq!(region.mito_states().len(), region.neuron_count());
        for n in region.neurons() {
            prop_assert!((0.0..=1.0).contains(&n.activation()));
            prop_assert!((0.0..=1.0).contains(&n.energy()));
            prop_assert!(n.health() >= 0.1 - 1e-6 && n.health() <= 1.0);
        }
        for s in region.all_synapses() {
            let b = s.bounds();
            prop_assert!(s.weight() >= b.min && s.weight() <= b.max);
            prop_assert!(s.eligibility() >= 0.0);
        }
    }
    let learning = brain.learning();
    prop_assert!(learning.pending_reward().abs() <= 2.0);
    prop_assert!((0.0..=1.0).contains(&learning.competence()));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_brain_stays_within_bounds(
        seed in 0u64..1000,
        parallel in any::<bool>(),
        script in proptest::collection::vec(drive(), 1..60),
    ) {
        let (brain, regions) = brain(seed, parallel);
        for action in script {
            match action {
                Drive::Feed(values) => {
                    brain.feed_external_pattern("input", &values);
                }
                Drive::Reward(r) => brain.deliver_reward(r, "prop", "{}"),
                Drive::Neuromodulate(level) => {
                    brain.apply_neuromodulator("output", level);
                }
                Drive::Attention(boost) => {
                    let map = regions[0].neuron_ids().into_iter().map(|id| (id, 0.8));
                    brain.apply_attention_modulation(map, boost);
                }
                Drive::Step(dt) => {
                    brain.process_step(dt);
                }
            }
            assert_bounds(&brain, &regions)?;
        }
        prop_assert!(serde_json::to_string(&brain.stats()).is_ok());
    }
}

#[test]
fn test_sequential_runs_are_reproducible() {
    let run = || {
        let (brain, regions) = brain(7, false);
        // without the Bernoulli gate no draw depends on map iteration order
        let mut learning = brain.learning().config();
        learning.p_gate = 1.0;
        brain.learning().set_config(learning);
        for step in 0..40 {
            if step % 10 == 0 {
                brain.feed_external_pattern("input", &[0.9; 16]);
            }
            brain.process_step(0.01);
        }
        regions
            .iter()
            .flat_map(|r| r.readout())
            .collect::<Vec<f32>>()
    };
    assert_eq!(run(), run());
}
