// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::thread;

use hypergraph_brain_development::regions::{amygdala, hippocampus};
use hypergraph_brain_development::{
    create, list_keys, register_alias, register_factory, with_variant, Hippocampus, MotorCortex,
    RegionRegistry, RegistryError,
};
use hypergraph_npu_region_engine::{RegionBuilder, RegionType};

const BUILTIN: [&str; 9] = [
    "amygdala",
    "auditory_cortex",
    "brainstem",
    "hippocampus",
    "motor_cortex",
    "prefrontal_cortex",
    "somatosensory_cortex",
    "thalamus",
    "visual_cortex",
];

#[test]
fn test_builtin_keys_sorted() {
    let keys = RegionRegistry::with_builtin().list_keys();
    assert_eq!(keys, BUILTIN.map(String::from).to_vec());
}

#[test]
fn test_aliases_resolve() {
    let registry = RegionRegistry::with_builtin();
    for (alias, key) in [
        ("V1", "visual_cortex"),
        ("pfc", "prefrontal_cortex"),
        ("a1", "auditory_cortex"),
        ("M1", "motor_cortex"),
        ("s1", "somatosensory_cortex"),
    ] {
        assert_eq!(registry.resolve(alias).as_deref(), Some(key));
        let region = registry.create(alias, "r", 6).unwrap();
        assert_eq!(region.behavior_kind(), Some(key));
    }
}

#[test]
fn test_every_variant_keeps_region_invariants() {
    let registry = RegionRegistry::with_builtin();
    for key in BUILTIN {
        let region = registry.create(key, key, 24).unwrap();
        assert_eq!(region.neuron_count(), 24);
        let ids = region.neuron_ids();
        for w in ids.windows(2) {
            region.connect_neurons(w[0], w[1], 0.4, hypergraph_npu_neural::SynapseType::Excitatory);
        }
        region.feed_external_pattern(&[0.9; 12]);
        for _ in 0..50 {
            region.process(0.01);
            for n in region.neurons() {
                let a = n.activation();
                assert!((0.0..=1.0).contains(&a), "{key}: activation {a}");
                assert!((0.0..=1.0).contains(&n.energy()));
            }
            assert!(region.check_invariants().is_ok(), "{key}");
        }
        assert!(!region.stats().behavior.is_null(), "{key}");
    }
}

#[test]
fn test_region_types() {
    let registry = RegionRegistry::with_builtin();
    let kind = |k: &str| registry.create(k, "x", 3).unwrap().region_type();
    assert_eq!(kind("visual_cortex"), RegionType::Cortical);
    assert_eq!(kind("thalamus"), RegionType::Subcortical);
    assert_eq!(kind("brainstem"), RegionType::Brainstem);
}

#[test]
fn test_variant_helpers() {
    let hpc = hippocampus::build("hpc", 10);
    assert!(hippocampus::set_position(&hpc, 0.5, 0.5));
    hpc.process(0.01);
    let episodes = with_variant(&hpc, |h: &mut Hippocampus| h.episode_count());
    assert!(episodes.is_some());
    assert!(with_variant(&hpc, |_: &mut MotorCortex| ()).is_none());

    let amy = amygdala::build("amy", 4);
    amy.feed_external_pattern(&[1.0, 0.5]);
    assert!(amygdala::tag_current(&amy, 0.7));
    assert!(!amygdala::tag_current(&hpc, 0.7));
}

#[test]
fn test_global_registry_accepts_custom_factories() {
    let fresh = register_factory("custom_probe", |name: &str, n: usize| {
        RegionBuilder::new(name).region_type(RegionType::Custom).neurons(n).build()
    })
    .unwrap();
    assert!(fresh);
    register_alias("probe", "CUSTOM_PROBE").unwrap();
    let region = create("Probe", "p", 2).unwrap();
    assert_eq!(region.region_type(), RegionType::Custom);
    assert!(list_keys().contains(&"custom_probe".to_string()));
    assert!(list_keys().contains(&"hippocampus".to_string()));
    assert_eq!(register_alias("ghost", "missing"), Err(RegistryError::UnknownKey("missing".into())));
}

#[test]
fn test_concurrent_registration() {
    let registry = Arc::new(RegionRegistry::empty());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                registry
                    .register_factory(&format!("k{i}"), |name: &str, n: usize| {
                        RegionBuilder::new(name).neurons(n).build()
                    })
                    .unwrap();
                registry.create(&format!("K{i}"), "x", 1).is_some()
            })
        })
        .collect();
    assert!(handles.into_iter().all(|h| h.join().unwrap()));
    assert_eq!(registry.list_keys().len(), 8);
}
