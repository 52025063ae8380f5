//=====================================================
// File: locator/classpath.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Host classpath resources for the resolver
// Objective: Abstract classpath lookups behind a provider trait with an
//            in-memory implementation for embedded resources
//=====================================================

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::unit::Resource;

pub const CLASSPATH_SCHEME: &str = "classpath:";

/// Resolves host classpath resources by slash-separated path.
pub trait ClasspathResourceProvider: Send + Sync {
    fn resolve(&self, path: &str) -> Option<Resource>;
}

/// Resources compiled into or registered with the host runtime.
#[derive(Debug, Default)]
pub struct EmbeddedResources {
    entries: RwLock<HashMap<String, Arc<[u8]>>>,
}

impl EmbeddedResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        let path = path.into();
        let path = path.trim_start_matches('/').to_string();
        self.entries.write().insert(path, bytes.into());
    }

    pub fn remove(&self, path: &str) -> bool {
        self.entries.write().remove(path.trim_start_matches('/')).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ClasspathResourceProvider for EmbeddedResources {
    fn resolve(&self, path: &str) -> Option<Resource> {
        // classpath resources never start with a slash
        if path.starts_with('/') {
            return None;
        }
        let entries = self.entries.read();
        let bytes = entries.get(path)?;
        Some(Resource::embedded(path, bytes.clone()))
    }
}

/// Strip a `classpath:` or `classpath:/` scheme.
pub fn strip_scheme(locator: &str) -> Option<&str> {
    let rest = locator.strip_prefix(CLASSPATH_SCHEME)?;
    Some(rest.strip_prefix('/').unwrap_or(rest))
}

pub fn looks_like_classpath(entry: &str) -> bool {
    entry.starts_with(CLASSPATH_SCHEME)
}

/// Canonical name of a classpath resource.
pub fn classpath_name(path: &str) -> String {
    format!("{CLASSPATH_SCHEME}/{path}")
}

/// Classpath path for `name` below a load path entry; an empty entry means
/// the classpath root.
pub fn join_entry(entry: &str, name: &str) -> String {
    let entry = entry.trim_end_matches('/');
    if entry.is_empty() {
        name.to_string()
    } else {
        format!("{entry}/{name}")
    }
}

/// Paths that classpath resources can never have: absolute or drive-letter.
pub fn is_filesystem_absolute(path: &str) -> bool {
    path.starts_with('/') || path.as_bytes().get(1) == Some(&b':')
}


//=====================================================
// End of file
//=====================================================
