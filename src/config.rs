//=====================================================
// File: config.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Settings consumed once when a load service starts
// Objective: Defaults, TOML files and environment overrides for the load
//            path, locking mode, suffix tables and diagnostics
//=====================================================

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::suffix::SuffixRules;

pub const GLOBAL_REQUIRE_LOCK_VAR: &str = "SOLVRA_GLOBAL_REQUIRE_LOCK";
pub const VERBOSE_VAR: &str = "SOLVRA_VERBOSE";
pub const DEBUG_LOAD_SERVICE_VAR: &str = "SOLVRA_DEBUG_LOAD_SERVICE";
pub const DEBUG_LOAD_TIMING_VAR: &str = "SOLVRA_DEBUG_LOAD_TIMING";

/// Load service configuration. Every field has a default, so partial TOML
/// files are fine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadServiceConfig {
    /// Appended after `init`'s directories and the library variable.
    pub load_paths: Vec<String>,
    /// Appended last, whether or not they exist.
    pub site_dirs: Vec<String>,
    /// Environment variable holding extra path-separated load path entries.
    pub lib_env_var: String,
    pub global_require_lock: bool,
    /// Warn about circular requires.
    pub verbose: bool,
    pub debug_search: bool,
    pub debug_timing: bool,
    pub precompiled_units: bool,
    pub source_suffix: String,
    pub extension_suffixes: Vec<String>,
    pub extension_markers: Vec<String>,
    pub disabled_native_suffixes: Vec<String>,
    /// Directory for `~/` names. Falls back to the user's home directory.
    pub home: Option<PathBuf>,
    /// Directory for `./` names and relative entries. Falls back to the
    /// process working directory.
    pub current_dir: Option<PathBuf>,
}

impl Default for LoadServiceConfig {
    fn default() -> Self {
        Self {
            load_paths: Vec::new(),
            site_dirs: Vec::new(),
            lib_env_var: "SOLVRA_LIB".to_string(),
            global_require_lock: false,
            verbose: false,
            debug_search: false,
            debug_timing: false,
            precompiled_units: false,
            source_suffix: ".rb".to_string(),
            extension_suffixes: vec![".jar".to_string()],
            extension_markers: [".so", ".o", ".dll", ".bundle", ".jar"]
                .into_iter()
                .map(String::from)
                .collect(),
            disabled_native_suffixes: [".so", ".dll", ".bundle"]
                .into_iter()
                .map(String::from)
                .collect(),
            home: None,
            current_dir: None,
        }
    }
}

impl LoadServiceConfig {
    pub fn from_toml_str(data: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&data, path)
    }

    /// Overlay the `SOLVRA_*` switches read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |name: &str| lookup(name).map(|value| is_truthy(&value));
        if let Some(on) = flag(GLOBAL_REQUIRE_LOCK_VAR) {
            self.global_require_lock = on;
        }
        if let Some(on) = flag(VERBOSE_VAR) {
            self.verbose = on;
        }
        if let Some(on) = flag(DEBUG_LOAD_SERVICE_VAR) {
            self.debug_search = on;
        }
        if let Some(on) = flag(DEBUG_LOAD_TIMING_VAR) {
            self.debug_timing = on;
        }
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|name| env::var(name).ok());
        config
    }

    /// Entries of the library variable, in order.
    pub fn lib_env_entries<F>(&self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(value) = lookup(&self.lib_env_var) else {
            return Vec::new();
        };
        env::split_paths(&value)
            .map(|entry| entry.display().to_string())
            .filter(|entry| !entry.is_empty())
            .collect()
    }

    pub fn rules(&self) -> SuffixRules {
        let rules = SuffixRules::new(
            &self.source_suffix,
            self.extension_suffixes.iter().cloned(),
            self.extension_markers.iter().cloned(),
        )
        .with_disabled_native(self.disabled_native_suffixes.iter().cloned());
        if self.precompiled_units {
            rules.with_precompiled()
        } else {
            rules
        }
    }

    pub fn home_dir(&self) -> Option<PathBuf> {
        self.home.clone().or_else(dirs::home_dir)
    }

    pub fn working_dir(&self) -> io::Result<PathBuf> {
        match &self.current_dir {
            Some(dir) => Ok(dir.clone()),
            None => env::current_dir(),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}


//=====================================================
// End of file
//=====================================================
