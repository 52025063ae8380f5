//=====================================================
// File: suffix.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Decide which filename suffixes a request probes
// Objective: Classify require/load names into a suffix policy and search base
//=====================================================

use serde::{Deserialize, Serialize};

//==================================================
// Section 1.0 - Policy
//==================================================

/// Which suffix family a search tries, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuffixPolicy {
    Source,
    Extension,
    Both,
    /// Exact name only, no suffix guessing.
    Neither,
}

/// Suffix tables and recognition markers for one service instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixRules {
    source: Vec<String>,
    extension: Vec<String>,
    extension_markers: Vec<String>,
    disabled_native: Vec<String>,
    source_marker: String,
}

impl Default for SuffixRules {
    fn default() -> Self {
        Self::new(".rb", [".jar"], [".so", ".o", ".dll", ".bundle", ".jar"])
    }
}

impl SuffixRules {
    pub fn new<E, M>(source_suffix: &str, extension_suffixes: E, extension_markers: M) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            source: vec![source_suffix.to_string()],
            extension: extension_suffixes.into_iter().map(Into::into).collect(),
            extension_markers: extension_markers.into_iter().map(Into::into).collect(),
            disabled_native: vec![".so".into(), ".dll".into(), ".bundle".into()],
            source_marker: source_suffix.to_string(),
        }
    }

    /// Also probe precompiled `.class` units after the source suffix.
    pub fn with_precompiled(mut self) -> Self {
        if !self.source.iter().any(|s| s == ".class") {
            self.source.push(".class".into());
        }
        self
    }

    pub fn with_disabled_native<I>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.disabled_native = suffixes.into_iter().map(Into::into).collect();
        self
    }

    /// Suffixes tried for `policy`. Source suffixes always precede extension
    /// suffixes; `Neither` yields the empty suffix only.
    pub fn suffixes(&self, policy: SuffixPolicy) -> Vec<&str> {
        match policy {
            SuffixPolicy::Source => self.source.iter().map(String::as_str).collect(),
            SuffixPolicy::Extension => self.extension.iter().map(String::as_str).collect(),
            SuffixPolicy::Both => self
                .source
                .iter()
                .chain(self.extension.iter())
                .map(String::as_str)
                .collect(),
            SuffixPolicy::Neither => vec![""],
        }
    }

    pub fn is_source_name(&self, name: &str) -> bool {
        extension_start(name).is_some() && name.ends_with(self.source_marker.as_str())
    }

    pub fn is_extension_name(&self, name: &str) -> bool {
        extension_start(name).is_some()
            && self
                .extension_markers
                .iter()
                .any(|marker| name.ends_with(marker.as_str()))
    }

    pub fn is_archive_name(&self, name: &str) -> bool {
        self.extension.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }

    pub fn is_precompiled_name(&self, name: &str) -> bool {
        name.ends_with(".class") && self.source.iter().any(|s| s == ".class")
    }

    pub fn is_disabled_native(&self, name: &str) -> bool {
        self.disabled_native
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
    }

    //==================================================
    // Section 2.0 - Classification
    //==================================================

    /// Classification used by `require`: an unrecognized extension still
    /// searches every known suffix.
    pub fn classify_for_require(&self, name: &str) -> (SuffixPolicy, String) {
        match extension_start(name) {
            Some(dot) if self.is_source_name(name) => (SuffixPolicy::Source, name[..dot].to_string()),
            Some(dot) if self.is_extension_name(name) => {
                (SuffixPolicy::Extension, name[..dot].to_string())
            }
            Some(_) => (SuffixPolicy::Both, name.to_string()),
            None => (SuffixPolicy::Both, name.to_string()),
        }
    }

    /// Classification used by `load`. Identical to require except that an
    /// unrecognized extension means the exact name only (`Neither`).
    pub fn classify_for_load(&self, name: &str) -> (SuffixPolicy, String) {
        match extension_start(name) {
            Some(dot) if self.is_source_name(name) => (SuffixPolicy::Source, name[..dot].to_string()),
            Some(dot) if self.is_extension_name(name) => {
                (SuffixPolicy::Extension, name[..dot].to_string())
            }
            Some(_) => (SuffixPolicy::Neither, name.to_string()),
            None => (SuffixPolicy::Both, name.to_string()),
        }
    }
}

/// Byte offset of the extension dot in the last path segment.
pub fn extension_start(name: &str) -> Option<usize> {
    let dot = name.rfind('.')?;
    if name[dot..].contains('/') {
        None
    } else {
        Some(dot)
    }
}


//=====================================================
// End of file
//=====================================================
