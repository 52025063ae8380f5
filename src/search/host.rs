//=====================================================
// File: search/host.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Host class lookups used by the late search strategies
// Objective: Derive conventional class names from logical names and resolve
//            them against the host runtime's class table
//=====================================================

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::unit::Resource;

/// Host runtime class lookups. Both calls answer "is this class loadable";
/// a false answer is never an error.
pub trait HostClassResolver: Send + Sync {
    /// Native extension service class. When `archive` is present it is made
    /// visible to the host class path before the lookup.
    fn find_service(&self, class_name: &str, archive: Option<&Resource>) -> bool;

    /// Directly executable precompiled script class.
    fn find_script_class(&self, class_name: &str) -> bool;
}

/// In-memory class table. Services may be registered as living inside a
/// particular archive, in which case they resolve only once that archive
/// has been attached.
#[derive(Debug, Default)]
pub struct HostClassTable {
    services: RwLock<HashSet<String>>,
    archived_services: RwLock<Vec<(String, String)>>,
    scripts: RwLock<HashSet<String>>,
    attached: RwLock<Vec<String>>,
}

impl HostClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_service(&self, class_name: impl Into<String>) {
        self.services.write().insert(class_name.into());
    }

    /// A service that becomes visible once `archive_suffix` (matched against
    /// the end of an attached archive's name) is attached.
    pub fn register_archived_service(&self, class_name: impl Into<String>, archive_suffix: impl Into<String>) {
        self.archived_services
            .write()
            .push((class_name.into(), archive_suffix.into()));
    }

    pub fn register_script_class(&self, class_name: impl Into<String>) {
        self.scripts.write().insert(class_name.into());
    }

    /// Archives attached to the host class path so far, in order.
    pub fn attached_archives(&self) -> Vec<String> {
        self.attached.read().clone()
    }

    fn attach(&self, archive: &Resource) {
        let mut attached = self.attached.write();
        if !attached.iter().any(|name| name == archive.name()) {
            attached.push(archive.name().to_string());
        }
    }
}

impl HostClassResolver for HostClassTable {
    fn find_service(&self, class_name: &str, archive: Option<&Resource>) -> bool {
        if let Some(archive) = archive {
            self.attach(archive);
        }
        if self.services.read().contains(class_name) {
            return true;
        }
        let attached = self.attached.read();
        self.archived_services.read().iter().any(|(name, suffix)| {
            name == class_name && attached.iter().any(|archive| archive.ends_with(suffix.as_str()))
        })
    }

    fn find_script_class(&self, class_name: &str) -> bool {
        self.scripts.read().contains(class_name)
    }
}

/// Resolver with no host classes at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHostClasses;

impl HostClassResolver for NoHostClasses {
    fn find_service(&self, _class_name: &str, _archive: Option<&Resource>) -> bool {
        false
    }

    fn find_script_class(&self, _class_name: &str) -> bool {
        false
    }
}

pub const SERVICE_CLASS_SUFFIX: &str = "Service";

/// `net/http_pool` -> `net.HttpPoolService`.
pub fn service_class_name(base: &str) -> String {
    let segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    let Some((last, parents)) = segments.split_last() else {
        return String::new();
    };

    let mut class_name = String::new();
    for parent in parents {
        if *parent == "." || *parent == ".." {
            continue;
        }
        class_name.push_str(&parent.to_lowercase());
        class_name.push('.');
    }
    for word in last.split('_') {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            class_name.extend(first.to_uppercase());
            class_name.push_str(chars.as_str());
        }
    }
    class_name.push_str(SERVICE_CLASS_SUFFIX);
    class_name.trim_start_matches('.').to_string()
}

/// `./lib/my-script.rb` -> `lib.my_minus_script`.
pub fn script_class_name(base: &str) -> String {
    let mut name = base.strip_prefix("./").unwrap_or(base).to_string();
    if let Some(dot) = name.rfind('.') {
        name.truncate(dot);
    }
    let name = name.replace('-', "_minus_").replace('.', "_");

    let start = name.rfind('/').map_or(0, |slash| slash + 1);
    let needs_prefix = name[start..]
        .chars()
        .next()
        .is_some_and(|c| !(c.is_alphabetic() || c == '_' || c == '$'));
    let name = if needs_prefix {
        format!("{}_{}", &name[..start], &name[start..])
    } else {
        name
    };
    name.replace('/', ".")
}


//=====================================================
// End of file
//=====================================================
