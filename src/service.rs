//=====================================================
// File: service.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Resolve and execute require/load requests
// Objective: Own the load path, loaded features, builtins and lock table for
//            one runtime, and drive search and loading for every request
//=====================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tracing::{info, warn};

use crate::config::LoadServiceConfig;
use crate::errors::{LoadError, LoaderError};
use crate::load_path::LoadPath;
use crate::locator::ResourceLocator;
use crate::locator::classpath::{ClasspathResourceProvider, EmbeddedResources};
use crate::registry::{BuiltinLibraries, LoadedFeatures};
use crate::require_lock::{LockOutcome, RequireLockTable};
use crate::search::host::{HostClassResolver, NoHostClasses};
use crate::search::{SearchContext, SearchOutcome, SearchPipeline, SearchRequest, SearchStrategy};
use crate::suffix::SuffixRules;
use crate::unit::LoadUnit;

//==================================================
// Section 1.0 - Collaborators and results
//==================================================

/// Executes resolved units. Gets the service back so loaded code can
/// require further libraries.
pub trait Loader: Send + Sync {
    fn load(&self, service: &LoadService, unit: LoadUnit, wrap: bool) -> Result<(), LoaderError>;
}

/// Successful result of `require`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequireOutcome {
    /// The loader ran and the feature is now registered.
    Loaded,
    /// Nothing to do: the feature was loaded before.
    AlreadyLoaded,
    /// The calling thread is already requiring this name; nothing was loaded.
    Circular,
}

impl RequireOutcome {
    pub fn is_loaded(self) -> bool {
        self == RequireOutcome::Loaded
    }
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

//==================================================
// Section 2.0 - Load timing
//==================================================

#[derive(Debug, Default)]
struct LoadTimer {
    enabled: bool,
    depth: AtomicUsize,
}

struct TimerScope<'a> {
    timer: &'a LoadTimer,
    name: String,
    depth: usize,
    started: Instant,
}

impl LoadTimer {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            depth: AtomicUsize::new(0),
        }
    }

    fn start(&self, name: &str) -> Option<TimerScope<'_>> {
        if !self.enabled {
            return None;
        }
        let depth = self.depth.fetch_add(1, Ordering::SeqCst);
        info!("{}-> {name}", "  ".repeat(depth));
        Some(TimerScope {
            timer: self,
            name: name.to_string(),
            depth,
            started: Instant::now(),
        })
    }
}

impl Drop for TimerScope<'_> {
    fn drop(&mut self) {
        self.timer.depth.fetch_sub(1, Ordering::SeqCst);
        info!(
            "{}<- {} - {}ms",
            "  ".repeat(self.depth),
            self.name,
            self.started.elapsed().as_millis()
        );
    }
}

//==================================================
// Section 3.0 - Builder
//==================================================

/// Assembles a [`LoadService`] from its configuration and collaborators.
pub struct LoadServiceBuilder {
    config: LoadServiceConfig,
    loader: Arc<dyn Loader>,
    classpath: Arc<dyn ClasspathResourceProvider>,
    host: Arc<dyn HostClassResolver>,
    strategies: Vec<Box<dyn SearchStrategy>>,
    env: EnvLookup,
}

impl LoadServiceBuilder {
    pub fn new(loader: Arc<dyn Loader>) -> Self {
        Self {
            config: LoadServiceConfig::default(),
            loader,
            classpath: Arc::new(EmbeddedResources::new()),
            host: Arc::new(NoHostClasses),
            strategies: Vec::new(),
            env: Arc::new(|name: &str| std::env::var(name).ok()),
        }
    }

    pub fn config(mut self, config: LoadServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn classpath(mut self, classpath: Arc<dyn ClasspathResourceProvider>) -> Self {
        self.classpath = classpath;
        self
    }

    pub fn host(mut self, host: Arc<dyn HostClassResolver>) -> Self {
        self.host = host;
        self
    }

    /// Append a strategy after the stock `require` strategies.
    pub fn strategy(mut self, strategy: impl SearchStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Environment lookup used by `init` for the library variable.
    pub fn env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    pub fn build(self) -> Result<LoadService, LoadError> {
        let config = self.config;
        let current_dir = config
            .working_dir()
            .map_err(|err| LoadError::io("current directory", err))?;
        let rules = config.rules();
        let locator = ResourceLocator::new(current_dir, config.home_dir(), rules.clone(), self.classpath)
            .with_debug(config.debug_search);

        let mut require_pipeline = SearchPipeline::for_require();
        for strategy in self.strategies {
            require_pipeline.push_boxed(strategy);
        }

        Ok(LoadService {
            locks: if config.global_require_lock {
                RequireLockTable::global()
            } else {
                RequireLockTable::new()
            },
            timer: LoadTimer::new(config.debug_timing),
            rules,
            locator,
            load_path: LoadPath::new(),
            loaded: LoadedFeatures::new(),
            builtins: BuiltinLibraries::new(),
            require_pipeline,
            load_pipeline: SearchPipeline::for_load(),
            loader: self.loader,
            host: self.host,
            env: self.env,
            config,
        })
    }
}

//==================================================
// Section 4.0 - Service
//==================================================

/// All require/load state for one runtime. Independent instances share
/// nothing.
pub struct LoadService {
    config: LoadServiceConfig,
    rules: SuffixRules,
    load_path: LoadPath,
    loaded: LoadedFeatures,
    builtins: BuiltinLibraries,
    locks: RequireLockTable,
    locator: ResourceLocator,
    require_pipeline: SearchPipeline,
    load_pipeline: SearchPipeline,
    loader: Arc<dyn Loader>,
    host: Arc<dyn HostClassResolver>,
    timer: LoadTimer,
    env: EnvLookup,
}

impl fmt::Debug for LoadService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadService")
            .field("load_path", &self.load_path.snapshot())
            .field("loaded", &self.loaded.len())
            .field("require_pipeline", &self.require_pipeline)
            .finish_non_exhaustive()
    }
}

impl LoadService {
    pub fn builder(loader: Arc<dyn Loader>) -> LoadServiceBuilder {
        LoadServiceBuilder::new(loader)
    }

    /// Reset loaded features and the load path, then populate the path:
    /// `additional` first, the library variable, configured entries and
    /// finally the site directories.
    pub fn init<I, S>(&self, additional: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.loaded.clear();
        self.load_path.clear();
        self.load_path.extend(additional);
        let env = self.env.as_ref();
        self.load_path.extend(self.config.lib_env_entries(env));
        self.load_path.extend(&self.config.load_paths);
        self.load_path.extend(&self.config.site_dirs);
    }

    pub fn config(&self) -> &LoadServiceConfig {
        &self.config
    }

    pub fn rules(&self) -> &SuffixRules {
        &self.rules
    }

    pub fn load_path(&self) -> &LoadPath {
        &self.load_path
    }

    pub fn add_path(&self, entry: &str) -> bool {
        self.load_path.push(entry)
    }

    pub fn add_paths<I, S>(&self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.load_path.extend(entries);
    }

    pub fn lock_table(&self) -> &RequireLockTable {
        &self.locks
    }

    //==================================================
    // Section 4.1 - require
    //==================================================

    /// Load `name` unless it was loaded before. Concurrent requires of one
    /// name run the loader at most once; a reentrant require of a name this
    /// thread is still loading returns [`RequireOutcome::Circular`].
    pub fn require(&self, name: &str) -> Result<RequireOutcome, LoadError> {
        self.require_with(name, true)
    }

    /// `require` on behalf of an autoload: no circular warning, and true
    /// unless the require was circular.
    pub fn autoload_require(&self, name: &str) -> Result<bool, LoadError> {
        Ok(self.require_with(name, false)? != RequireOutcome::Circular)
    }

    fn require_with(&self, name: &str, warn_circular: bool) -> Result<RequireOutcome, LoadError> {
        if name.is_empty() {
            return Err(LoadError::not_found(name));
        }
        if self.loaded.contains(name) {
            return Ok(RequireOutcome::AlreadyLoaded);
        }

        let _guard = match self.locks.acquire(name) {
            LockOutcome::Acquired(guard) => guard,
            LockOutcome::AlreadyHeldByCaller => return Ok(self.circular(name, warn_circular)),
        };
        let _timer = self.timer.start(name);

        if self.loaded.contains(name) {
            return Ok(RequireOutcome::AlreadyLoaded);
        }

        let request = SearchRequest::for_require(name, &self.rules);
        let outcome = self.search(&self.require_pipeline, &request)?;
        if outcome.is_already_loaded() {
            return Ok(RequireOutcome::AlreadyLoaded);
        }
        let Some(unit) = outcome.into_unit() else {
            return Err(LoadError::not_found(name));
        };

        // Different spellings of one library meet on the resolved name.
        let canonical = unit.canonical_name().to_string();
        let _canonical_guard = if canonical == name {
            None
        } else {
            match self.locks.acquire(&canonical) {
                LockOutcome::Acquired(guard) => Some(guard),
                LockOutcome::AlreadyHeldByCaller => return Ok(self.circular(name, warn_circular)),
            }
        };
        if self.loaded.contains(&canonical) {
            return Ok(RequireOutcome::AlreadyLoaded);
        }

        self.invoke(name, unit, false)?;
        self.loaded.insert(name, &canonical);
        Ok(RequireOutcome::Loaded)
    }

    fn circular(&self, name: &str, warn_circular: bool) -> RequireOutcome {
        if warn_circular && self.config.verbose {
            warn!("loading in progress, circular require considered harmful - {name}");
        }
        RequireOutcome::Circular
    }

    /// Resolve `name` the way `require` would, without loading or locking.
    /// A trailing `.so` is looked up as `.jar`.
    pub fn find_file_for_require(&self, name: &str) -> Result<Option<LoadUnit>, LoadError> {
        if name.is_empty() {
            return Ok(None);
        }
        let name = match name.strip_suffix(".so") {
            Some(stem) => format!("{stem}.jar"),
            None => name.to_string(),
        };
        let request = SearchRequest::for_require(&name, &self.rules);
        Ok(self.search(&self.require_pipeline, &request)?.into_unit())
    }

    //==================================================
    // Section 4.2 - load
    //==================================================

    /// Execute `name` unconditionally: no dedup, no locking, nothing
    /// registered.
    pub fn load(&self, name: &str, wrap: bool) -> Result<(), LoadError> {
        if name.is_empty() {
            return Err(LoadError::not_found(name));
        }
        let _timer = self.timer.start(name);
        let request = SearchRequest::for_load(name, &self.rules);
        let unit = self
            .search(&self.load_pipeline, &request)?
            .into_unit()
            .ok_or_else(|| LoadError::not_found(name))?;
        self.invoke(name, unit, wrap)
    }

    /// Load a resource straight from the classpath provider.
    pub fn load_from_classpath(&self, name: &str, wrap: bool) -> Result<(), LoadError> {
        let _timer = self.timer.start(name);
        let load_path = self.load_path.snapshot();
        let unit = self
            .locator
            .find_in_classpath(name, &load_path)?
            .ok_or_else(|| LoadError::not_found(name))?;
        self.invoke(name, unit, wrap)
    }

    //==================================================
    // Section 4.3 - Features and builtins
    //==================================================

    /// Mark `name` loaded and resolvable without touching the filesystem.
    pub fn provide(&self, name: &str) {
        self.builtins.register(name, LoadUnit::provided(name));
        self.loaded.insert(name, name);
    }

    pub fn add_builtin_library(&self, name: &str, mut unit: LoadUnit) {
        unit.set_canonical_name(name.to_string());
        self.builtins.register(name, unit);
    }

    pub fn remove_builtin_library(&self, name: &str) -> Option<LoadUnit> {
        self.builtins.remove(name)
    }

    pub fn builtin_libraries(&self) -> Vec<String> {
        self.builtins.names()
    }

    /// Forget a loaded feature so the next require loads it again.
    pub fn remove_loaded_feature(&self, name: &str) -> bool {
        self.loaded.remove(name)
    }

    pub fn loaded_features(&self) -> Vec<String> {
        self.loaded.snapshot()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains(name)
    }

    //==================================================
    // Section 4.4 - Internals
    //==================================================

    fn search(&self, pipeline: &SearchPipeline, request: &SearchRequest) -> Result<SearchOutcome, LoadError> {
        let load_path = self.load_path.snapshot();
        let cx = SearchContext {
            rules: &self.rules,
            loaded: &self.loaded,
            builtins: &self.builtins,
            locator: &self.locator,
            load_path: &load_path,
            host: self.host.as_ref(),
            debug: self.config.debug_search,
        };
        pipeline.run(&cx, request)
    }

    fn invoke(&self, name: &str, unit: LoadUnit, wrap: bool) -> Result<(), LoadError> {
        let canonical = unit.canonical_name().to_string();
        self.loader.load(self, unit, wrap).map_err(|err| match err {
            LoaderError::Exit { status } => LoadError::Exit { status },
            LoaderError::Io(source) => LoadError::io(canonical, source),
            LoaderError::Failed(source) => LoadError::LoadFailed {
                name: name.to_string(),
                source,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        units: Mutex<Vec<String>>,
    }

    impl Loader for Recorder {
        fn load(&self, _service: &LoadService, unit: LoadUnit, _wrap: bool) -> Result<(), LoaderError> {
            self.units.lock().push(unit.canonical_name().to_string());
            Ok(())
        }
    }

    fn service(dir: &std::path::Path, recorder: Arc<Recorder>) -> LoadService {
        let config = LoadServiceConfig {
            current_dir: Some(dir.to_path_buf()),
            home: Some(dir.to_path_buf()),
            ..LoadServiceConfig::default()
        };
        LoadService::builder(recorder)
            .config(config)
            .env(|_| None)
            .build()
            .unwrap()
    }

    #[test]
    fn init_orders_entries() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoadServiceConfig {
            current_dir: Some(dir.path().to_path_buf()),
            load_paths: vec!["/configured".into()],
            site_dirs: vec!["/site".into()],
            ..LoadServiceConfig::default()
        };
        let service = LoadService::builder(Arc::new(Recorder::default()))
            .config(config)
            .env(|name| (name == "SOLVRA_LIB").then(|| "/from_env".to_string()))
            .build()
            .unwrap();
        service.add_path("/stale");
        service.init(["/first", ""]);
        assert_eq!(
            *service.load_path().snapshot(),
            vec!["/first", "/from_env", "/configured", "/site"]
        );
    }

    #[test]
    fn provide_marks_loaded_without_loader() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Recorder::default());
        let service = service(dir.path(), recorder.clone());
        service.provide("thread.rb");
        assert_eq!(service.require("thread").unwrap(), RequireOutcome::AlreadyLoaded);
        assert_eq!(service.require("thread.rb").unwrap(), RequireOutcome::AlreadyLoaded);
        assert!(recorder.units.lock().is_empty());
    }

    #[test]
    fn empty_name_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), Arc::new(Recorder::default()));
        assert!(service.require("").unwrap_err().is_not_found());
        assert!(service.load("", false).unwrap_err().is_not_found());
    }

    #[test]
    fn remove_loaded_feature_allows_reload() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("again.rb"), "").unwrap();
        let recorder = Arc::new(Recorder::default());
        let service = service(dir.path(), recorder.clone());
        service.add_path(&dir.path().display().to_string());

        assert!(service.require("again").unwrap().is_loaded());
        assert!(service.remove_loaded_feature("again"));
        assert!(service.require("again").unwrap().is_loaded());
        assert_eq!(recorder.units.lock().len(), 2);
    }
}

//=====================================================
// End of file
//=====================================================
