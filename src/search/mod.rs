//=====================================================
// File: search/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Ordered search over every place a library can live
// Objective: Drive a list of strategies over one request, stopping early on
//            a bailout, and report what was found (if anything)
//=====================================================

pub mod host;
pub mod strategies;

use std::fmt;

use crate::errors::LoadError;
use crate::locator::ResourceLocator;
use crate::registry::{BuiltinLibraries, LoadedFeatures};
use crate::suffix::{SuffixPolicy, SuffixRules};
use crate::unit::LoadUnit;

use self::host::HostClassResolver;
use self::strategies::{
    BailoutStrategy, ClasspathStrategy, DirectPathStrategy, ExtensionStrategy,
    ScriptClassStrategy, SourceBailoutStrategy,
};

//==================================================
// Section 1.0 - Request and outcome
//==================================================

/// One search, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    logical_name: String,
    suffix_policy: SuffixPolicy,
    search_base: String,
}

impl SearchRequest {
    pub fn for_require(name: &str, rules: &SuffixRules) -> Self {
        let (suffix_policy, search_base) = rules.classify_for_require(name);
        Self {
            logical_name: name.to_string(),
            suffix_policy,
            search_base,
        }
    }

    pub fn for_load(name: &str, rules: &SuffixRules) -> Self {
        let (suffix_policy, search_base) = rules.classify_for_load(name);
        Self {
            logical_name: name.to_string(),
            suffix_policy,
            search_base,
        }
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn suffix_policy(&self) -> SuffixPolicy {
        self.suffix_policy
    }

    pub fn search_base(&self) -> &str {
        &self.search_base
    }
}

/// What the pipeline produced.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    unit: Option<LoadUnit>,
    stopped_by: Option<&'static str>,
    already_loaded: bool,
}

impl SearchOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self) -> bool {
        self.unit.is_some()
    }

    pub fn unit(&self) -> Option<&LoadUnit> {
        self.unit.as_ref()
    }

    pub fn into_unit(self) -> Option<LoadUnit> {
        self.unit
    }

    pub fn canonical_name(&self) -> Option<&str> {
        self.unit.as_ref().map(LoadUnit::canonical_name)
    }

    /// Name of the strategy that ended the search early.
    pub fn stopped_by(&self) -> Option<&'static str> {
        self.stopped_by
    }

    /// Unresolved because a bailout found the feature already loaded.
    /// Other strategies that stop the search leave this false.
    pub fn is_already_loaded(&self) -> bool {
        self.unit.is_none() && self.already_loaded
    }

    pub fn mark_already_loaded(&mut self) {
        self.already_loaded = true;
    }

    pub fn resolve(&mut self, unit: LoadUnit) {
        self.unit = Some(unit);
    }
}

/// Whether the pipeline goes on after a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFlow {
    Continue,
    Stop,
}

//==================================================
// Section 2.0 - Strategies
//==================================================

/// Shared, read-only state a strategy searches against.
pub struct SearchContext<'a> {
    pub rules: &'a SuffixRules,
    pub loaded: &'a LoadedFeatures,
    pub builtins: &'a BuiltinLibraries,
    pub locator: &'a ResourceLocator,
    pub load_path: &'a [String],
    pub host: &'a dyn HostClassResolver,
    /// Trace probes at debug level.
    pub debug: bool,
}

/// One step of the search. `try_search` may resolve the outcome, replace it,
/// or stop the whole pipeline; missing resources are never errors.
pub trait SearchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn should_try(&self, request: &SearchRequest, outcome: &SearchOutcome) -> bool;

    fn try_search(
        &self,
        cx: &SearchContext<'_>,
        request: &SearchRequest,
        outcome: &mut SearchOutcome,
    ) -> Result<SearchFlow, LoadError>;
}

//==================================================
// Section 3.0 - Pipeline
//==================================================

/// Strategies in the order they run.
pub struct SearchPipeline {
    strategies: Vec<Box<dyn SearchStrategy>>,
}

impl fmt::Debug for SearchPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl SearchPipeline {
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Default order for `require`.
    pub fn for_require() -> Self {
        let mut pipeline = Self::empty();
        pipeline.push(SourceBailoutStrategy);
        pipeline.push(DirectPathStrategy);
        pipeline.push(ClasspathStrategy);
        pipeline.push(BailoutStrategy);
        pipeline.push(ExtensionStrategy);
        pipeline.push(ScriptClassStrategy);
        pipeline
    }

    /// `load` always re-executes, so it has no bailouts.
    pub fn for_load() -> Self {
        let mut pipeline = Self::empty();
        pipeline.push(DirectPathStrategy);
        pipeline.push(ClasspathStrategy);
        pipeline.push(ExtensionStrategy);
        pipeline.push(ScriptClassStrategy);
        pipeline
    }

    pub fn push(&mut self, strategy: impl SearchStrategy + 'static) {
        self.strategies.push(Box::new(strategy));
    }

    pub fn push_boxed(&mut self, strategy: Box<dyn SearchStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn run(&self, cx: &SearchContext<'_>, request: &SearchRequest) -> Result<SearchOutcome, LoadError> {
        let mut outcome = SearchOutcome::new();
        for strategy in &self.strategies {
            if !strategy.should_try(request, &outcome) {
                continue;
            }
            if strategy.try_search(cx, request, &mut outcome)? == SearchFlow::Stop {
                outcome.stopped_by = Some(strategy.name());
                break;
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_and_load_orders() {
        assert_eq!(
            SearchPipeline::for_require().names(),
            vec!["source-bailout", "direct-path", "classpath", "bailout", "extension", "script-class"]
        );
        assert_eq!(
            SearchPipeline::for_load().names(),
            vec!["direct-path", "classpath", "extension", "script-class"]
        );
    }

    #[test]
    fn request_keeps_logical_name() {
        let rules = SuffixRules::default();
        let request = SearchRequest::for_require("lib/foo.rb", &rules);
        assert_eq!(request.logical_name(), "lib/foo.rb");
        assert_eq!(request.search_base(), "lib/foo");
        assert_eq!(request.suffix_policy(), SuffixPolicy::Source);
    }
}

//=====================================================
// End of file
//=====================================================
