//=====================================================
// File: unit.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Describe what a successful search hands to the loader
// Objective: Tag resolved units by kind and give the loader a byte source
//=====================================================

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::LoadError;
use crate::locator::archive::Archive;
use crate::suffix::SuffixRules;

/// Where a resource's bytes live.
#[derive(Debug, Clone)]
pub enum ResourceLocation {
    File(PathBuf),
    ArchiveEntry { archive: Arc<Archive>, entry: String },
    Embedded(Arc<[u8]>),
}

/// A located, readable resource. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    location: ResourceLocation,
}

impl Resource {
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: ResourceLocation::File(path.into()),
        }
    }

    pub fn archive_entry(name: impl Into<String>, archive: Arc<Archive>, entry: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: ResourceLocation::ArchiveEntry {
                archive,
                entry: entry.into(),
            },
        }
    }

    pub fn embedded(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            location: ResourceLocation::Embedded(bytes.into()),
        }
    }

    /// Name the resource was found under (path, archive locator or
    /// classpath path).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &ResourceLocation {
        &self.location
    }

    pub fn read(&self) -> io::Result<Vec<u8>> {
        match &self.location {
            ResourceLocation::File(path) => fs::read(path),
            ResourceLocation::ArchiveEntry { archive, entry } => archive.read_entry(entry),
            ResourceLocation::Embedded(bytes) => Ok(bytes.to_vec()),
        }
    }

    pub fn read_to_string(&self) -> io::Result<String> {
        let bytes = self.read()?;
        String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

/// Coarse unit kind, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    SourceScript,
    CompiledScript,
    NativeExtension,
    PackagedArchiveEntry,
    ClasspathResource,
    HostClassEntryPoint,
}

/// A resolved loadable unit. Created by a probe, consumed by the loader.
#[derive(Debug, Clone)]
pub enum LoadUnit {
    SourceScript {
        canonical_name: String,
        resource: Resource,
    },
    /// Precompiled script (`.class`).
    CompiledScript {
        canonical_name: String,
        resource: Resource,
    },
    /// Host-native extension reached through its service class.
    NativeExtension {
        canonical_name: String,
        service_class: String,
        archive: Option<Resource>,
    },
    /// An archive library (`.jar`) found on the load path or the classpath.
    PackagedArchiveEntry {
        canonical_name: String,
        resource: Resource,
    },
    ClasspathResource {
        canonical_name: String,
        resource: Resource,
    },
    HostClassEntryPoint {
        canonical_name: String,
        class_name: String,
    },
}

impl LoadUnit {
    /// Build the unit matching a found resource's suffix.
    pub(crate) fn from_resource(
        resource: Resource,
        canonical_name: String,
        rules: &SuffixRules,
        from_classpath: bool,
    ) -> Result<Self, LoadError> {
        let file = resource.name();
        if rules.is_disabled_native(file) {
            return Err(LoadError::NativeExtensionDisabled {
                name: file.to_string(),
            });
        }
        let unit = if rules.is_archive_name(file) {
            LoadUnit::PackagedArchiveEntry {
                canonical_name,
                resource,
            }
        } else if rules.is_precompiled_name(file) {
            LoadUnit::CompiledScript {
                canonical_name,
                resource,
            }
        } else if from_classpath {
            LoadUnit::ClasspathResource {
                canonical_name,
                resource,
            }
        } else {
            LoadUnit::SourceScript {
                canonical_name,
                resource,
            }
        };
        Ok(unit)
    }

    /// Placeholder unit used by `provide`.
    pub fn provided(name: impl Into<String>) -> Self {
        let name = name.into();
        LoadUnit::HostClassEntryPoint {
            class_name: String::new(),
            canonical_name: name,
        }
    }

    pub fn canonical_name(&self) -> &str {
        match self {
            LoadUnit::SourceScript { canonical_name, .. }
            | LoadUnit::CompiledScript { canonical_name, .. }
            | LoadUnit::NativeExtension { canonical_name, .. }
            | LoadUnit::PackagedArchiveEntry { canonical_name, .. }
            | LoadUnit::ClasspathResource { canonical_name, .. }
            | LoadUnit::HostClassEntryPoint { canonical_name, .. } => canonical_name,
        }
    }

    pub(crate) fn set_canonical_name(&mut self, name: String) {
        match self {
            LoadUnit::SourceScript { canonical_name, .. }
            | LoadUnit::CompiledScript { canonical_name, .. }
            | LoadUnit::NativeExtension { canonical_name, .. }
            | LoadUnit::PackagedArchiveEntry { canonical_name, .. }
            | LoadUnit::ClasspathResource { canonical_name, .. }
            | LoadUnit::HostClassEntryPoint { canonical_name, .. } => *canonical_name = name,
        }
    }

    pub fn kind(&self) -> UnitKind {
        match self {
            LoadUnit::SourceScript { .. } => UnitKind::SourceScript,
            LoadUnit::CompiledScript { .. } => UnitKind::CompiledScript,
            LoadUnit::NativeExtension { .. } => UnitKind::NativeExtension,
            LoadUnit::PackagedArchiveEntry { .. } => UnitKind::PackagedArchiveEntry,
            LoadUnit::ClasspathResource { .. } => UnitKind::ClasspathResource,
            LoadUnit::HostClassEntryPoint { .. } => UnitKind::HostClassEntryPoint,
        }
    }

    pub fn resource(&self) -> Option<&Resource> {
        match self {
            LoadUnit::SourceScript { resource, .. }
            | LoadUnit::CompiledScript { resource, .. }
            | LoadUnit::PackagedArchiveEntry { resource, .. }
            | LoadUnit::ClasspathResource { resource, .. } => Some(resource),
            LoadUnit::NativeExtension { archive, .. } => archive.as_ref(),
            LoadUnit::HostClassEntryPoint { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_suffix_selects_unit_kind() {
        let rules = SuffixRules::default().with_precompiled();
        let kind = |name: &str, classpath: bool| {
            LoadUnit::from_resource(
                Resource::embedded(name, Vec::<u8>::new()),
                name.to_string(),
                &rules,
                classpath,
            )
            .map(|unit| unit.kind())
        };
        assert_eq!(kind("a.rb", false).ok(), Some(UnitKind::SourceScript));
        assert_eq!(kind("a.rb", true).ok(), Some(UnitKind::ClasspathResource));
        assert_eq!(kind("a.jar", false).ok(), Some(UnitKind::PackagedArchiveEntry));
        assert_eq!(kind("a.class", false).ok(), Some(UnitKind::CompiledScript));
        assert!(matches!(
            kind("a.so", false),
            Err(LoadError::NativeExtensionDisabled { .. })
        ));
    }

    #[test]
    fn embedded_resource_reads_back() {
        let resource = Resource::embedded("greet.rb", b"puts 1".to_vec());
        assert_eq!(resource.read_to_string().unwrap(), "puts 1");
    }
}

//=====================================================
// End of file
//=====================================================
