// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Learning rules against small hand-built regions

use std::sync::Arc;

use hypergraph_config::{
    AttentionConfig, AttentionMode, LearningConfig, RegionConfig, RewardConfig,
    StructuralPlasticityConfig,
};
use hypergraph_npu_neural::{NeuronId, SpikeEvent, Synapse, SynapseType, STDP_TAU_MS};
use hypergraph_npu_plasticity::{
    DevelopmentalModulator, LearningKind, LearningModulation, LearningSystem,
};
use hypergraph_npu_region_engine::{ActivationPattern, Region, RegionBuilder};
use hypergraph_observability::{MemoryTelemetry, TelemetryHandle};
use proptest::prelude::*;

const DT: f32 = 0.016;

fn region(name: &str, n: usize) -> Arc<Region> {
    RegionBuilder::new(name)
        .pattern(ActivationPattern::Synchronous)
        .config(&RegionConfig {
            exploration_noise: false,
            ..Default::default()
        })
        .neurons(n)
        .build()
}

/// Only the rule under test is switched on
fn quiet() -> LearningConfig {
    LearningConfig {
        hebbian_rate: 0.0,
        stdp_rate: 0.0,
        decay_rate: 0.0,
        p_gate: 1.0,
        ..Default::default()
    }
}

fn pair(name: &str, weight: f32) -> (Arc<Region>, Arc<Synapse>, NeuronId, NeuronId) {
    let r = region(name, 2);
    let ids = r.neuron_ids();
    let syn = r
        .connect_neurons(ids[0], ids[1], weight, SynapseType::Excitatory)
        .expect("both endpoints are members");
    (r, syn, ids[0], ids[1])
}

#[test]
fn test_single_hebbian_potentiation() {
    let (r, syn, a, b) = pair("hebb", 0.5);
    r.neuron(a).unwrap().set_activation(1.0);
    r.neuron(b).unwrap().set_activation(1.0);

    let ls = LearningSystem::new(LearningConfig {
        hebbian_rate: 0.1,
        ..quiet()
    });
    ls.update_learning(DT, &[Arc::clone(&r)]);

    let gate = r.neuron(b).unwrap().energy_gate();
    let expected = 0.5 + 0.1 * 1.0 * 1.0 * DT * gate;
    assert!((syn.weight() - expected).abs() < 1e-6, "weight {}", syn.weight());
    assert!(syn.eligibility() > 0.0);
    assert_eq!(ls.stats().hebbian_updates, 1);
}

#[test]
fn test_hebbian_skips_silent_pairs() {
    let (r, syn, a, _) = pair("silent", 0.5);
    r.neuron(a).unwrap().set_activation(1.0);
    let ls = LearningSystem::new(LearningConfig {
        hebbian_rate: 0.1,
        ..quiet()
    });
    ls.update_learning(DT, &[r]);
    assert_eq!(syn.weight(), 0.5);
    assert_eq!(syn.eligibility(), 0.0);
}

#[test]
fn test_stdp_sign_selection() {
    let eta = 0.01;
    let expected = eta * (-5.0 / STDP_TAU_MS).exp();
    let ls = LearningSystem::new(LearningConfig {
        stdp_rate: eta,
        ..quiet()
    });

    let (r, syn, a, b) = pair("stdp", 0.5);
    ls.record_spike(&SpikeEvent { neuron_id: a, time_ms: 0.0 });
    ls.record_spike(&SpikeEvent { neuron_id: b, time_ms: 5.0 });
    ls.update_learning(DT, &[Arc::clone(&r)]);
    let potentiation = syn.weight() - 0.5;
    assert!((potentiation - expected).abs() < 1e-6);

    syn.set_weight(0.5);
    ls.record_spike(&SpikeEvent { neuron_id: b, time_ms: 100.0 });
    ls.record_spike(&SpikeEvent { neuron_id: a, time_ms: 105.0 });
    ls.update_learning(DT, &[Arc::clone(&r)]);
    let depression = syn.weight() - 0.5;
    assert!((depression + expected).abs() < 1e-6);

    // Spikes are only paired within the step they were recorded in
    ls.update_learning(DT, &[r]);
    assert!((syn.weight() - 0.5 - depression).abs() < 1e-7);
}

#[test]
fn test_stdp_batch_path_matches_scalar_kernel() {
    let ls = LearningSystem::new(LearningConfig {
        stdp_rate: 0.02,
        ..quiet()
    });
    let r = region("batch", 12);
    let ids = r.neuron_ids();
    let mut synapses = Vec::new();
    for (i, src) in ids.iter().enumerate() {
        for (j, tgt) in ids.iter().enumerate() {
            if i < j {
                synapses.push(r.connect_neurons(*src, *tgt, 0.5, SynapseType::Excitatory).unwrap());
            }
        }
    }
    assert!(synapses.len() >= hypergraph_npu_plasticity::STDP_BATCH_THRESHOLD);
    for (k, id) in ids.iter().enumerate() {
        ls.record_spike(&SpikeEvent { neuron_id: *id, time_ms: k as f64 });
    }
    ls.update_learning(DT, &[r]);
    for syn in &synapses {
        let idx = |id: NeuronId| ids.iter().position(|x| *x == id).unwrap() as f32;
        let dt_ms = idx(syn.target_id()) - idx(syn.source_id());
        let expected = 0.5 + 0.02 * (-dt_ms / STDP_TAU_MS).exp();
        assert!((syn.weight() - expected).abs() < 1e-6);
    }
}

#[test]
fn test_reward_modulation_consumed_once() {
    let (r, syn, _, _) = pair("reward", 0.5);
    let ls = LearningSystem::new(LearningConfig {
        reward: RewardConfig {
            lambda: 0.9,
            eta_elig: 0.1,
            kappa: 0.1,
            ..Default::default()
        },
        ..quiet()
    });

    let mut e = 0.0f32;
    for _ in 0..5 {
        ls.note_pre_post(&syn, 1.0, 1.0);
        e = 0.9 * e + 0.1;
    }
    assert!((syn.eligibility() - e).abs() < 1e-6);

    ls.apply_external_reward(1.0);
    assert_eq!(ls.pending_reward(), 1.0);
    ls.update_learning(DT, &[Arc::clone(&r)]);
    assert_eq!(ls.pending_reward(), 0.0);
    let after_first = syn.weight();
    assert!((after_first - (0.5 + 0.1 * e)).abs() < 1e-6);

    ls.update_learning(DT, &[r]);
    assert_eq!(syn.weight(), after_first);
    assert_eq!(ls.stats().rewards_applied, 1);
}

#[test]
fn test_p_gate_fraction_converges() {
    let p = 0.3f32;
    let ls = LearningSystem::new(LearningConfig {
        hebbian_rate: 0.001,
        p_gate: p,
        ..quiet()
    });
    ls.set_random_seed(7);

    let r = region("gate", 10);
    let ids = r.neuron_ids();
    let mut made = 0;
    'outer: for src in &ids {
        for tgt in &ids {
            if src != tgt {
                r.connect_neurons(*src, *tgt, 0.1, SynapseType::Excitatory);
                made += 1;
                if made == 50 {
                    break 'outer;
                }
            }
        }
    }
    for n in r.neurons() {
        n.set_activation(1.0);
    }

    let steps = 200;
    for _ in 0..steps {
        ls.update_learning(DT, &[Arc::clone(&r)]);
    }
    let stats = ls.stats();
    let trials = (stats.hebbian_updates + stats.gate_skips) as f64;
    assert_eq!(trials, (50 * steps) as f64);
    let observed = stats.hebbian_updates as f64 / trials;
    let sigma = (p as f64 * (1.0 - p as f64) / trials).sqrt();
    assert!(
        (observed - p as f64).abs() <= 3.0 * sigma,
        "observed {observed}, expected {p} ± {}",
        3.0 * sigma
    );
}

#[test]
fn test_consolidation_invariant_without_decay() {
    let (r, syn, _, _) = pair("consolidate", 0.42);
    let ls = LearningSystem::new(LearningConfig {
        consolidation_interval: 0.01,
        ..quiet()
    });
    for _ in 0..10 {
        ls.update_learning(DT, &[Arc::clone(&r)]);
    }
    assert_eq!(syn.weight(), 0.42);
    assert_eq!(ls.stats().consolidations, 10);

    ls.set_config(LearningConfig {
        consolidation_interval: 0.01,
        decay_rate: 0.5,
        ..quiet()
    });
    ls.update_learning(DT, &[r]);
    assert!((syn.weight() - 0.21).abs() < 1e-6);
}

#[test]
fn test_empty_attention_map_only_counts() {
    let ls = LearningSystem::new(LearningConfig {
        attention: AttentionConfig {
            enable_attention_modulation: true,
            attention_mode: AttentionMode::ExternalMap,
            attention_boost_factor: 1.5,
            ..Default::default()
        },
        ..quiet()
    });
    let before = ls.current_attention_boost();
    ls.apply_attention_modulation(std::iter::empty::<(NeuronId, f32)>(), 3.0);
    let stats = ls.stats();
    assert_eq!(stats.attention_calls, 1);
    assert_eq!(stats.attention_map_size, 0);
    assert_eq!(ls.current_attention_boost(), before);
}

#[test]
fn test_external_attention_map_scales_hebbian() {
    let (r, syn, a, b) = pair("attend", 0.5);
    r.neuron(a).unwrap().set_activation(1.0);
    r.neuron(b).unwrap().set_activation(1.0);
    let telemetry = Arc::new(MemoryTelemetry::new());

    let ls = LearningSystem::new(LearningConfig {
        hebbian_rate: 0.1,
        attention: AttentionConfig {
            enable_attention_modulation: true,
            attention_mode: AttentionMode::ExternalMap,
            a_min: 0.5,
            a_max: 3.0,
            ..Default::default()
        },
        ..quiet()
    });
    ls.set_telemetry(TelemetryHandle::new(telemetry.clone(), 1, "test"));
    // Weight clamps to 1.0 and boost to a_max
    ls.apply_attention_modulation([(b, 7.0)], 10.0);
    assert_eq!(ls.current_attention_boost(), 3.0);
    assert_eq!(telemetry.events("attention").len(), 1);

    ls.update_learning(DT, &[r]);
    let expected = 0.5 + 0.1 * 3.0 * DT;
    assert!((syn.weight() - expected).abs() < 1e-6);
}

struct BlockHebbian;

impl DevelopmentalModulator for BlockHebbian {
    fn learning_modulation(&self, kind: LearningKind, region_name: &str) -> Option<LearningModulation> {
        (kind == LearningKind::Hebbian && region_name == "juvenile").then(|| LearningModulation {
            is_restricted: true,
            ..Default::default()
        })
    }
}

#[test]
fn test_developmental_restriction_skips_region() {
    let (young, young_syn, ya, yb) = pair("juvenile", 0.5);
    let (adult, adult_syn, aa, ab) = pair("adult", 0.5);
    for (r, x, y) in [(&young, ya, yb), (&adult, aa, ab)] {
        r.neuron(x).unwrap().set_activation(1.0);
        r.neuron(y).unwrap().set_activation(1.0);
    }
    let ls = LearningSystem::new(LearningConfig {
        hebbian_rate: 0.1,
        ..quiet()
    });
    ls.set_developmental_modulator(Some(Arc::new(BlockHebbian)));
    ls.update_learning(DT, &[young, adult]);

    assert_eq!(young_syn.weight(), 0.5);
    assert!(adult_syn.weight() > 0.5);
    assert_eq!(ls.stats().restricted_skips, 1);
}

#[test]
fn test_shutdown_is_idempotent() {
    let (r, syn, _, _) = pair("shutdown", 0.5);
    let ls = LearningSystem::new(quiet());
    syn.set_eligibility(0.7);
    ls.update_learning(DT, &[Arc::clone(&r)]);
    ls.record_spike(&SpikeEvent {
        neuron_id: syn.source_id(),
        time_ms: 1.0,
    });

    ls.shutdown();
    assert!(!ls.is_active());
    assert_eq!(syn.eligibility(), 0.0);
    assert_eq!(ls.last_spike_ms(syn.source_id()), None);

    ls.shutdown();
    ls.apply_external_reward(1.0);
    ls.update_learning(DT, &[r]);
    assert_eq!(ls.pending_reward(), 0.0);
    assert!(!ls.stats().is_active);
}

#[test]
fn test_structural_gate_blocks_growth_not_pruning() {
    let r = region("starved", 6);
    let ids = r.neuron_ids();
    let weak = r
        .connect_neurons(ids[0], ids[1], 0.001, SynapseType::Excitatory)
        .unwrap();
    for id in &ids {
        r.neuron(*id).unwrap().set_activation(0.9);
        r.set_neuron_metabolic(*id, 0.1, 1.0);
    }

    let ls = LearningSystem::new(LearningConfig {
        structural: StructuralPlasticityConfig {
            enabled: true,
            prune_threshold: 0.01,
            energy_gate: 0.5,
            ..Default::default()
        },
        ..quiet()
    });
    let report = ls.structural_cycle(&[Arc::clone(&r)]);
    assert_eq!(report.pruned, 1);
    assert_eq!(report.gated, 1);
    assert_eq!(report.spawned, 0);
    assert_eq!(report.grown, 0);
    assert!(weak.is_retired());
    assert_eq!(r.neuron_count(), 6);

    for id in &ids {
        r.set_neuron_metabolic(*id, 0.9, 1.0);
    }
    let report = ls.structural_cycle(&[Arc::clone(&r)]);
    assert_eq!(report.spawned, 4);
    assert_eq!(report.grown, 8);
    assert_eq!(ls.stats().grown_total, 8);
}

#[test]
fn test_structural_runs_on_interval() {
    let r = region("interval", 3);
    let ids = r.neuron_ids();
    r.connect_neurons(ids[0], ids[1], 0.001, SynapseType::Excitatory);
    let ls = LearningSystem::new(LearningConfig {
        structural: StructuralPlasticityConfig {
            enabled: true,
            interval_steps: 3,
            prune_threshold: 0.01,
            ..Default::default()
        },
        ..quiet()
    });
    ls.update_learning(DT, &[Arc::clone(&r)]);
    ls.update_learning(DT, &[Arc::clone(&r)]);
    assert_eq!(r.synapse_count(), 1);
    ls.update_learning(DT, &[Arc::clone(&r)]);
    assert_eq!(r.synapse_count(), 0);
    assert_eq!(ls.stats().structural_cycles, 1);
}

#[test]
fn test_auto_eligibility_on_spike() {
    let (r, syn, a, _) = pair("auto", 0.5);
    let ls = LearningSystem::new(LearningConfig {
        reward: RewardConfig {
            auto_eligibility: true,
            ..Default::default()
        },
        ..quiet()
    });
    let neuron = r.neuron(a).unwrap();
    ls.on_neuron_spike(&neuron);
    assert!((syn.eligibility() - 0.1).abs() < 1e-6);
    for _ in 0..20 {
        ls.on_neuron_spike(&neuron);
    }
    assert!(syn.eligibility() <= 1.0);
}

#[test]
fn test_shaped_reward_novelty_fades() {
    let ls = LearningSystem::new(LearningConfig {
        reward: RewardConfig {
            alpha: 0.5,
            gamma: 1.0,
            eta: 0.1,
            mu: 0.0,
            novelty_obs_weight: 0.5,
            novelty_sub_weight: 0.5,
            ..Default::default()
        },
        ..quiet()
    });
    let obs = [0.2, 0.4, 0.6];
    let acts = [0.5, 0.5];
    let first = ls.compute_shaped_reward(&obs, &acts, 0.0);
    assert!((first - 0.5).abs() < 1e-6);
    let second = ls.compute_shaped_reward(&obs, &acts, 0.0);
    assert!(second.abs() < 1e-5);
    let task = ls.compute_shaped_reward(&obs, &acts, 10.0);
    assert_eq!(task, 2.0);
}

proptest! {
    #[test]
    fn prop_rewards_stay_clamped(rewards in proptest::collection::vec(-50.0f32..50.0, 1..40)) {
        let ls = LearningSystem::new(quiet());
        for r in rewards {
            ls.apply_external_reward(r);
            let pending = ls.pending_reward();
            prop_assert!((-2.0..=2.0).contains(&pending));
            let c = ls.competence();
            prop_assert!((0.0..=1.0).contains(&c));
        }
    }
}
