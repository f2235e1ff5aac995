// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
RegionRegistry - process-wide keyed region factory.

Keys and aliases are case-insensitive (stored lowercase). The global
instance is created on first access and already holds every specialised
region in [`crate::regions`]. Registration from several threads is
serialised by one lock; factories run outside it, so a factory may itself
use the registry.

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

use std::sync::Arc;

use ahash::AHashMap;
use hypergraph_npu_region_engine::Region;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::types::{RegistryError, RegistryResult};

/// `(name, neuron_count) → region`
pub type RegionFactory = Arc<dyn Fn(&str, usize) -> Arc<Region> + Send + Sync>;

/// Global singleton instance
static INSTANCE: Lazy<RegionRegistry> = Lazy::new(RegionRegistry::with_builtin);

#[derive(Default)]
struct Tables {
    factories: AHashMap<String, RegionFactory>,
    aliases: AHashMap<String, String>,
}

pub struct RegionRegistry {
    tables: RwLock<Tables>,
}

impl std::fmt::Debug for RegionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionRegistry")
            .field("keys", &self.list_keys())
            .field("aliases", &self.list_aliases())
            .finish()
    }
}

fn normalize(key: &str) -> RegistryResult<String> {
    let key = key.trim().to_lowercase();
    if key.is_empty() {
        return Err(RegistryError::EmptyKey);
    }
    Ok(key)
}

impl RegionRegistry {
    /// Registry with nothing registered
    pub fn empty() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Registry preloaded with the specialised regions and their aliases
    pub fn with_builtin() -> Self {
        let registry = Self::empty();
        crate::regions::register_builtin(&registry);
        registry
    }

    /// The process-wide registry
    pub fn global() -> &'static RegionRegistry {
        &INSTANCE
    }

    /// Register or replace a factory; returns `true` if the key was new
    pub fn register_factory<F>(&self, key: &str, factory: F) -> RegistryResult<bool>
    where
        F: Fn(&str, usize) -> Arc<Region> + Send + Sync + 'static,
    {
        let key = normalize(key)?;
        let mut tables = self.tables.write();
        if tables.aliases.contains_key(&key) {
            return Err(RegistryError::AliasConflict(key));
        }
        let fresh = tables.factories.insert(key.clone(), Arc::new(factory)).is_none();
        debug!(target: "registry", key = %key, fresh, "registered region factory");
        Ok(fresh)
    }

    /// Make `alias` resolve to `key`, which must already be registered
    pub fn register_alias(&self, alias: &str, key: &str) -> RegistryResult<()> {
        let alias = normalize(alias)?;
        let key = normalize(key)?;
        let mut tables = self.tables.write();
        if tables.factories.contains_key(&alias) {
            return Err(RegistryError::AliasConflict(alias));
        }
        let target = tables.aliases.get(&key).cloned().unwrap_or(key);
        if !tables.factories.contains_key(&target) {
            return Err(RegistryError::UnknownKey(target));
        }
        debug!(target: "registry", alias = %alias, key = %target, "registered alias");
        tables.aliases.insert(alias, target);
        Ok(())
    }

    /// Canonical key for a key or alias
    pub fn resolve(&self, key: &str) -> Option<String> {
        let key = normalize(key).ok()?;
        let tables = self.tables.read();
        if tables.factories.contains_key(&key) {
            return Some(key);
        }
        tables.aliases.get(&key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.resolve(key).is_some()
    }

    pub fn try_create(&self, key: &str, name: &str, neuron_count: usize) -> RegistryResult<Arc<Region>> {
        let canonical = normalize(key)?;
        let factory = {
            let tables = self.tables.read();
            let resolved = tables.aliases.get(&canonical).unwrap_or(&canonical);
            tables
                .factories
                .get(resolved)
                .cloned()
                .ok_or_else(|| RegistryError::UnknownKey(canonical.clone()))?
        };
        Ok(factory(name, neuron_count))
    }

    /// Build a region from a key or alias; `None` for unknown keys
    pub fn create(&self, key: &str, name: &str, neuron_count: usize) -> Option<Arc<Region>> {
        match self.try_create(key, name, neuron_count) {
            Ok(region) => Some(region),
            Err(e) => {
                warn!(target: "registry", key, error = %e, "region not created");
                None
            }
        }
    }

    /// Registered factory keys, sorted
    pub fn list_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.tables.read().factories.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// `(alias, key)` pairs, sorted by alias
    pub fn list_aliases(&self) -> Vec<(String, String)> {
        let mut aliases: Vec<(String, String)> = self
            .tables
            .read()
            .aliases
            .iter()
            .map(|(a, k)| (a.clone(), k.clone()))
            .collect();
        aliases.sort();
        aliases
    }
}

/// [`RegionRegistry::register_factory`] on the global registry
pub fn register_factory<F>(key: &str, factory: F) -> RegistryResult<bool>
where
    F: Fn(&str, usize) -> Arc<Region> + Send + Sync + 'static,
{
    RegionRegistry::global().register_factory(key, factory)
}

/// [`RegionRegistry::register_alias`] on the global registry
pub fn register_alias(alias: &str, key: &str) -> RegistryResult<()> {
    RegionRegistry::global().register_alias(alias, key)
}

/// [`RegionRegistry::create`] on the global registry
pub fn create(key: &str, name: &str, neuron_count: usize) -> Option<Arc<Region>> {
    RegionRegistry::global().create(key, name, neuron_count)
}

/// [`RegionRegistry::list_keys`] on the global registry
pub fn list_keys() -> Vec<String> {
    RegionRegistry::global().list_keys()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypergraph_npu_region_engine::RegionBuilder;

    fn plain(name: &str, n: usize) -> Arc<Region> {
        RegionBuilder::new(name).neurons(n).build()
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let registry = RegionRegistry::empty();
        assert_eq!(registry.register_factory("Plain", plain), Ok(true));
        assert_eq!(registry.register_factory("PLAIN", plain), Ok(false));
        let r = registry.create("pLaIn", "x", 3).unwrap();
        assert_eq!(r.neuron_count(), 3);
        assert_eq!(registry.list_keys(), vec!["plain".to_string()]);
    }

    #[test]
    fn test_alias_rules() {
        let registry = RegionRegistry::empty();
        assert_eq!(
            registry.register_alias("p", "plain"),
            Err(RegistryError::UnknownKey("plain".into()))
        );
        registry.register_factory("plain", plain).unwrap();
        registry.register_alias("P", "plain").unwrap();
        // Alias of an alias resolves to the canonical key
        registry.register_alias("pp", "p").unwrap();
        assert_eq!(registry.resolve("PP").as_deref(), Some("plain"));
        assert_eq!(
            registry.register_factory("p", plain),
            Err(RegistryError::AliasConflict("p".into()))
        );
        assert_eq!(registry.register_alias("", "plain"), Err(RegistryError::EmptyKey));
    }

    #[test]
    fn test_unknown_key() {
        let registry = RegionRegistry::empty();
        assert!(registry.create("nope", "x", 1).is_none());
        assert_eq!(
            registry.try_create("nope", "x", 1).err(),
            Some(RegistryError::UnknownKey("nope".into()))
        );
    }
}
