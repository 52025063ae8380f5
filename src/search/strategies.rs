//=====================================================
// File: search/strategies.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: The stock search strategies
// Objective: Bailouts, direct path search, classpath search, native
//            extension discovery and host script classes
//=====================================================

use std::path::Path;

use tracing::debug;

use crate::errors::LoadError;
use crate::suffix::{SuffixPolicy, extension_start};
use crate::unit::{LoadUnit, UnitKind};

use super::host::{script_class_name, service_class_name};
use super::{SearchContext, SearchFlow, SearchOutcome, SearchRequest, SearchStrategy};

//==================================================
// Section 1.0 - Bailouts
//==================================================

fn any_loaded(cx: &SearchContext<'_>, base: &str, suffixes: &[&str]) -> bool {
    suffixes
        .iter()
        .any(|suffix| cx.loaded.contains(&format!("{base}{suffix}")))
}

/// Stops when a source-suffixed form of the name is already loaded. Skipped
/// for names with an explicit extension suffix, so `require "foo.jar"` still
/// runs after `foo.rb` was loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceBailoutStrategy;

impl SearchStrategy for SourceBailoutStrategy {
    fn name(&self) -> &'static str {
        "source-bailout"
    }

    fn should_try(&self, request: &SearchRequest, _outcome: &SearchOutcome) -> bool {
        request.suffix_policy() != SuffixPolicy::Extension
    }

    fn try_search(
        &self,
        cx: &SearchContext<'_>,
        request: &SearchRequest,
        outcome: &mut SearchOutcome,
    ) -> Result<SearchFlow, LoadError> {
        let suffixes = cx.rules.suffixes(SuffixPolicy::Source);
        if any_loaded(cx, request.search_base(), &suffixes) {
            outcome.mark_already_loaded();
            return Ok(SearchFlow::Stop);
        }
        Ok(SearchFlow::Continue)
    }
}

/// Stops when nothing was found but some suffixed form of the name is
/// already loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct BailoutStrategy;

impl SearchStrategy for BailoutStrategy {
    fn name(&self) -> &'static str {
        "bailout"
    }

    fn should_try(&self, _request: &SearchRequest, outcome: &SearchOutcome) -> bool {
        !outcome.is_resolved()
    }

    fn try_search(
        &self,
        cx: &SearchContext<'_>,
        request: &SearchRequest,
        outcome: &mut SearchOutcome,
    ) -> Result<SearchFlow, LoadError> {
        let suffixes = cx.rules.suffixes(request.suffix_policy());
        if any_loaded(cx, request.search_base(), &suffixes) {
            outcome.mark_already_loaded();
            return Ok(SearchFlow::Stop);
        }
        Ok(SearchFlow::Continue)
    }
}

//==================================================
// Section 2.0 - Direct path search
//==================================================

/// Builtins, name-level archive URLs, then the filesystem: `./`, `~/`,
/// absolute and `../` names directly, everything else through the load path.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectPathStrategy;

impl DirectPathStrategy {
    fn builtin(cx: &SearchContext<'_>, base: &str, suffixes: &[&str]) -> Option<LoadUnit> {
        suffixes.iter().find_map(|suffix| {
            let key = format!("{base}{suffix}");
            let mut unit = cx.builtins.get(&key)?;
            unit.set_canonical_name(key);
            Some(unit)
        })
    }

    fn load_path_or_url(
        cx: &SearchContext<'_>,
        base: &str,
        suffixes: &[&str],
    ) -> Result<Option<LoadUnit>, LoadError> {
        let locator = cx.locator;
        if base.starts_with("./") {
            return locator.probe_dot_slash(base, suffixes);
        }
        if base.starts_with("~/") {
            return locator.probe_home(base, suffixes);
        }
        if Path::new(base).is_absolute() || base.starts_with("../") {
            for suffix in suffixes {
                if let Some(unit) = locator.probe_as_is(&format!("{base}{suffix}"))? {
                    return Ok(Some(unit));
                }
            }
            return Ok(None);
        }
        for entry in cx.load_path {
            for suffix in suffixes {
                if let Some(unit) = locator.probe_load_path_entry(entry, &format!("{base}{suffix}"))? {
                    return Ok(Some(unit));
                }
            }
        }
        Ok(None)
    }

    fn search(
        cx: &SearchContext<'_>,
        base: &str,
        policy: SuffixPolicy,
        with_builtins: bool,
    ) -> Result<Option<LoadUnit>, LoadError> {
        let suffixes = cx.rules.suffixes(policy);
        if with_builtins {
            if let Some(unit) = Self::builtin(cx, base, &suffixes) {
                return Ok(Some(unit));
            }
        }
        if let Some(unit) = cx.locator.probe_archive_url(base, &suffixes)? {
            return Ok(Some(unit));
        }
        Self::load_path_or_url(cx, base, &suffixes)
    }
}

impl SearchStrategy for DirectPathStrategy {
    fn name(&self) -> &'static str {
        "direct-path"
    }

    fn should_try(&self, _request: &SearchRequest, outcome: &SearchOutcome) -> bool {
        !outcome.is_resolved()
    }

    fn try_search(
        &self,
        cx: &SearchContext<'_>,
        request: &SearchRequest,
        outcome: &mut SearchOutcome,
    ) -> Result<SearchFlow, LoadError> {
        let base = request.search_base();
        let found = match request.suffix_policy() {
            SuffixPolicy::Both => match Self::search(cx, base, SuffixPolicy::Source, true)? {
                Some(unit) => Some(unit),
                None => Self::search(cx, base, SuffixPolicy::Extension, true)?,
            },
            policy @ (SuffixPolicy::Source | SuffixPolicy::Extension) => Self::search(cx, base, policy, true)?,
            SuffixPolicy::Neither => Self::search(cx, base, SuffixPolicy::Neither, false)?,
        };
        if let Some(unit) = found {
            outcome.resolve(unit);
        }
        Ok(SearchFlow::Continue)
    }
}

//==================================================
// Section 3.0 - Classpath search
//==================================================

/// Resources packaged with the host runtime itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClasspathStrategy;

impl SearchStrategy for ClasspathStrategy {
    fn name(&self) -> &'static str {
        "classpath"
    }

    fn should_try(&self, _request: &SearchRequest, outcome: &SearchOutcome) -> bool {
        !outcome.is_resolved()
    }

    fn try_search(
        &self,
        cx: &SearchContext<'_>,
        request: &SearchRequest,
        outcome: &mut SearchOutcome,
    ) -> Result<SearchFlow, LoadError> {
        for suffix in cx.rules.suffixes(request.suffix_policy()) {
            let name = format!("{}{suffix}", request.search_base());
            if let Some(unit) = cx.locator.find_in_classpath(&name, cx.load_path)? {
                outcome.resolve(unit);
                break;
            }
        }
        Ok(SearchFlow::Continue)
    }
}

//==================================================
// Section 4.0 - Host classes
//==================================================

/// Native extension discovery through a conventional service class. Runs
/// when an archive library was found, or when nothing was found for a name
/// without an extension; a miss keeps whatever was found before.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtensionStrategy;

impl SearchStrategy for ExtensionStrategy {
    fn name(&self) -> &'static str {
        "extension"
    }

    fn should_try(&self, request: &SearchRequest, outcome: &SearchOutcome) -> bool {
        let base = request.search_base();
        if base.is_empty() {
            return false;
        }
        match outcome.unit() {
            Some(unit) => unit.kind() == UnitKind::PackagedArchiveEntry,
            None => {
                matches!(request.suffix_policy(), SuffixPolicy::Both | SuffixPolicy::Extension)
                    && extension_start(base).is_none()
            }
        }
    }

    fn try_search(
        &self,
        cx: &SearchContext<'_>,
        request: &SearchRequest,
        outcome: &mut SearchOutcome,
    ) -> Result<SearchFlow, LoadError> {
        let service_class = service_class_name(request.search_base());
        if service_class.is_empty() {
            return Ok(SearchFlow::Continue);
        }
        if cx.debug {
            debug!(probe = "jarWithExtension", "trying {service_class}");
        }

        let archive = outcome
            .unit()
            .filter(|unit| unit.kind() == UnitKind::PackagedArchiveEntry)
            .and_then(LoadUnit::resource)
            .cloned();
        if !cx.host.find_service(&service_class, archive.as_ref()) {
            return Ok(SearchFlow::Continue);
        }

        if cx.debug {
            debug!(probe = "jarWithExtension", "found {service_class}");
        }
        let canonical_name = match outcome.canonical_name() {
            Some(name) => name.to_string(),
            None => request.search_base().to_string(),
        };
        outcome.resolve(LoadUnit::NativeExtension {
            canonical_name,
            service_class,
            archive,
        });
        Ok(SearchFlow::Continue)
    }
}

/// Last resort: a precompiled script class named after the path.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptClassStrategy;

impl SearchStrategy for ScriptClassStrategy {
    fn name(&self) -> &'static str {
        "script-class"
    }

    fn should_try(&self, _request: &SearchRequest, outcome: &SearchOutcome) -> bool {
        !outcome.is_resolved()
    }

    fn try_search(
        &self,
        cx: &SearchContext<'_>,
        request: &SearchRequest,
        outcome: &mut SearchOutcome,
    ) -> Result<SearchFlow, LoadError> {
        let class_name = script_class_name(request.search_base());
        if class_name.is_empty() || !cx.host.find_script_class(&class_name) {
            return Ok(SearchFlow::Continue);
        }
        outcome.resolve(LoadUnit::HostClassEntryPoint {
            canonical_name: request.logical_name().to_string(),
            class_name,
        });
        Ok(SearchFlow::Continue)
    }
}


//=====================================================
// End of file
//=====================================================
