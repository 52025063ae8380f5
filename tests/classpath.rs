//==============================================
// File: tests/classpath.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Host-provided resources and classes
// Objective: Classpath load path entries, bare classpath names, direct
//            classpath loads, script classes and appended strategies
//==============================================

mod util;

use std::sync::Arc;

use solvra_load::search::{SearchContext, SearchFlow, SearchOutcome, SearchRequest, SearchStrategy};
use solvra_load::{
    EmbeddedResources, HostClassTable, LoadError, LoadService, LoadServiceConfig, LoadUnit,
    RequireOutcome, UnitKind,
};
use util::{RecordingLoader, config_in, path_str, write_file};

fn service_with_resources(
    config: LoadServiceConfig,
    resources: Arc<EmbeddedResources>,
    loader: Arc<RecordingLoader>,
) -> LoadService {
    let service = LoadService::builder(loader)
        .config(config)
        .classpath(resources)
        .env(|_| None)
        .build()
        .unwrap();
    service.init(Vec::<String>::new());
    service
}

#[test]
fn classpath_entry_on_load_path() {
    let dir = tempfile::tempdir().unwrap();
    let resources = Arc::new(EmbeddedResources::new());
    resources.insert("stdlib/set.rb", b"class Set; end".to_vec());
    let loader = RecordingLoader::new();
    let service = service_with_resources(config_in(dir.path()), resources, loader.clone());
    service.add_path("classpath:/stdlib");

    assert!(service.require("set").unwrap().is_loaded());
    let call = &loader.calls()[0];
    assert_eq!(call.kind, UnitKind::ClasspathResource);
    assert_eq!(call.canonical_name, "classpath:/stdlib/set.rb");
    assert_eq!(service.require("set").unwrap(), RequireOutcome::AlreadyLoaded);
}

#[test]
fn bare_classpath_name_is_found_after_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let resources = Arc::new(EmbeddedResources::new());
    resources.insert("bundled.rb", b"".to_vec());
    resources.insert("shadowed.rb", b"".to_vec());
    let on_disk = write_file(dir.path(), "shadowed.rb", "");
    let loader = RecordingLoader::new();
    let service = service_with_resources(config_in(dir.path()), resources, loader.clone());
    service.add_path(&path_str(dir.path()));

    service.require("bundled").unwrap();
    service.require("shadowed").unwrap();
    assert_eq!(
        loader.names(),
        vec!["classpath:/bundled.rb".to_string(), path_str(&on_disk)]
    );
}

#[test]
fn load_from_classpath_skips_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let resources = Arc::new(EmbeddedResources::new());
    resources.insert("boot/init.rb", b"".to_vec());
    let loader = RecordingLoader::new();
    let service = service_with_resources(config_in(dir.path()), resources, loader.clone());

    service.load_from_classpath("boot/init.rb", true).unwrap();
    service.load_from_classpath("classpath:/boot/init.rb", false).unwrap();
    assert_eq!(loader.count(), 2);
    assert!(loader.calls()[0].wrap);
    assert!(matches!(
        service.load_from_classpath("boot/missing.rb", false),
        Err(LoadError::NotFound { .. })
    ));
}

#[test]
fn precompiled_units_resolve_as_compiled_scripts() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "fast.class", "");
    let mut config = config_in(dir.path());
    config.precompiled_units = true;
    let loader = RecordingLoader::new();
    let service = service_with_resources(config, Arc::new(EmbeddedResources::new()), loader.clone());
    service.add_path(&path_str(dir.path()));

    service.require("fast").unwrap();
    assert_eq!(loader.calls()[0].kind, UnitKind::CompiledScript);
}

#[test]
fn disabled_native_suffix_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "cext.so", "");
    let loader = RecordingLoader::new();

    // `.so` names are looked up with the archive suffix, never as `.so`
    let service = service_with_resources(config_in(dir.path()), Arc::new(EmbeddedResources::new()), loader.clone());
    service.add_path(&path_str(dir.path()));
    assert!(service.load("cext.so", false).unwrap_err().is_not_found());

    let mut config = config_in(dir.path());
    config.extension_suffixes = vec![".so".to_string()];
    let service = service_with_resources(config, Arc::new(EmbeddedResources::new()), loader.clone());
    service.add_path(&path_str(dir.path()));
    assert!(matches!(
        service.require("cext"),
        Err(LoadError::NativeExtensionDisabled { .. })
    ));
    assert!(service.lock_table().is_empty());
    assert_eq!(loader.count(), 0);
}

#[test]
fn script_class_is_the_last_resort() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(HostClassTable::new());
    host.register_script_class("tools.code_minus_gen");
    let loader = RecordingLoader::new();
    let service = LoadService::builder(loader.clone())
        .config(config_in(dir.path()))
        .host(host)
        .env(|_| None)
        .build()
        .unwrap();

    assert!(service.require("tools/code-gen").unwrap().is_loaded());
    let call = &loader.calls()[0];
    assert_eq!(call.kind, UnitKind::HostClassEntryPoint);
    assert_eq!(call.canonical_name, "tools/code-gen");
}

struct VirtualLibraries;

impl SearchStrategy for VirtualLibraries {
    fn name(&self) -> &'static str {
        "virtual"
    }

    fn should_try(&self, _request: &SearchRequest, outcome: &SearchOutcome) -> bool {
        !outcome.is_resolved()
    }

    fn try_search(
        &self,
        _cx: &SearchContext<'_>,
        request: &SearchRequest,
        outcome: &mut SearchOutcome,
    ) -> Result<SearchFlow, LoadError> {
        if request.search_base().starts_with("virtual/") {
            outcome.resolve(LoadUnit::HostClassEntryPoint {
                canonical_name: format!("virtual:{}", request.search_base()),
                class_name: String::new(),
            });
        }
        Ok(SearchFlow::Continue)
    }
}

#[test]
fn appended_strategy_runs_after_stock_ones() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.debug_search = true;
    config.debug_timing = true;
    let loader = RecordingLoader::new();
    let service = LoadService::builder(loader.clone())
        .config(config)
        .strategy(VirtualLibraries)
        .env(|_| None)
        .build()
        .unwrap();

    assert!(service.require("virtual/thing").unwrap().is_loaded());
    assert_eq!(loader.names(), vec!["virtual:virtual/thing"]);
    assert!(service.require("real/thing").unwrap_err().is_not_found());
}

struct Barricade;

impl SearchStrategy for Barricade {
    fn name(&self) -> &'static str {
        "barricade"
    }

    fn should_try(&self, _request: &SearchRequest, _outcome: &SearchOutcome) -> bool {
        true
    }

    fn try_search(
        &self,
        _cx: &SearchContext<'_>,
        _request: &SearchRequest,
        _outcome: &mut SearchOutcome,
    ) -> Result<SearchFlow, LoadError> {
        Ok(SearchFlow::Stop)
    }
}

#[test]
fn stopping_strategy_without_unit_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let loader = RecordingLoader::new();
    let service = LoadService::builder(loader.clone())
        .config(config_in(dir.path()))
        .strategy(Barricade)
        .env(|_| None)
        .build()
        .unwrap();

    let err = service.require("walled/off").unwrap_err();
    assert!(matches!(&err, LoadError::NotFound { name } if name == "walled/off"));
    assert_eq!(loader.count(), 0);
}

//==============================================
// End of file
//==============================================
