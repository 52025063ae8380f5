//==================================================
// File: registry.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Track what this process has already loaded and what is built in
// Objective: Provide the loaded-feature set (with short-name index) and the
//            builtin library table consulted before any filesystem probe
//==================================================

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::unit::LoadUnit;

//==================================================
// Section 1.0 - Loaded features
//==================================================

#[derive(Debug, Default)]
struct FeatureSet {
    ordered: Vec<String>,
    members: HashSet<String>,
    // requested name -> canonical name
    index: HashMap<String, String>,
}

/// Canonical names loaded in this process, in load order.
#[derive(Debug, Default)]
pub struct LoadedFeatures {
    inner: RwLock<FeatureSet>,
}

impl LoadedFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` was loaded, either as a canonical name or as the name
    /// a caller originally requested.
    pub fn contains(&self, name: &str) -> bool {
        let inner = self.inner.read();
        inner.members.contains(name) || inner.index.contains_key(name)
    }

    /// Record `canonical` as loaded, reachable also under `requested`.
    /// Returns false when the canonical name was already present.
    pub fn insert(&self, requested: &str, canonical: &str) -> bool {
        let mut inner = self.inner.write();
        if requested != canonical {
            inner
                .index
                .insert(requested.to_string(), canonical.to_string());
        }
        if inner.members.insert(canonical.to_string()) {
            inner.ordered.push(canonical.to_string());
            true
        } else {
            false
        }
    }

    /// Forget `name` and every requested name pointing at it.
    pub fn remove(&self, name: &str) -> bool {
        let mut inner = self.inner.write();
        let canonical = match inner.index.get(name) {
            Some(canonical) if !inner.members.contains(name) => canonical.clone(),
            _ => name.to_string(),
        };
        let removed = inner.members.remove(&canonical);
        inner.ordered.retain(|feature| feature != &canonical);
        inner
            .index
            .retain(|requested, target| target != &canonical && requested != name);
        removed
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.inner.read().ordered.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().ordered.is_empty()
    }

    pub fn clear(&self) {
        *self.inner.write() = FeatureSet::default();
    }
}

//==================================================
// Section 2.0 - Builtin libraries
//==================================================

/// Libraries implemented directly by the host, keyed by `name + suffix`.
#[derive(Debug, Default)]
pub struct BuiltinLibraries {
    units: RwLock<HashMap<String, LoadUnit>>,
}

impl BuiltinLibraries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, unit: LoadUnit) {
        self.units.write().insert(name.into(), unit);
    }

    pub fn remove(&self, name: &str) -> Option<LoadUnit> {
        self.units.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<LoadUnit> {
        self.units.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.units.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent_and_indexes_requested_name() {
        let features = LoadedFeatures::new();
        assert!(features.insert("greet", "/tmp/testlibs/greet.rb"));
        assert!(!features.insert("greet", "/tmp/testlibs/greet.rb"));
        assert!(features.contains("greet"));
        assert!(features.contains("/tmp/testlibs/greet.rb"));
        assert!(!features.contains("greet.rb"));
        assert_eq!(features.snapshot(), vec!["/tmp/testlibs/greet.rb"]);
    }

    #[test]
    fn remove_by_requested_or_canonical_name() {
        let features = LoadedFeatures::new();
        features.insert("a", "/lib/a.rb");
        features.insert("b", "/lib/b.rb");
        assert!(features.remove("a"));
        assert!(!features.contains("a"));
        assert!(!features.contains("/lib/a.rb"));
        assert!(features.remove("/lib/b.rb"));
        assert!(!features.contains("b"));
        assert!(features.is_empty());
    }

    #[test]
    fn builtins_register_and_remove() {
        let builtins = BuiltinLibraries::new();
        builtins.register("thread.rb", LoadUnit::provided("thread.rb"));
        assert!(builtins.contains("thread.rb"));
        assert_eq!(builtins.names(), vec!["thread.rb"]);
        assert!(builtins.remove("thread.rb").is_some());
        assert!(builtins.get("thread.rb").is_none());
    }
}

//==================================================
// End of file
//==================================================
