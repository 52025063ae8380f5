//=====================================================
// File: lib.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: solvra_load library interface
// Objective: Export the load service, search pipeline, resource locators,
//            require locks, registries and configuration
//=====================================================

pub mod config;
pub mod errors;
pub mod load_path;
pub mod locator;
pub mod logging;
pub mod registry;
pub mod require_lock;
pub mod search;
pub mod service;
pub mod suffix;
pub mod unit;

pub use config::LoadServiceConfig;
pub use errors::{ConfigError, LoadError, LoaderError};
pub use load_path::LoadPath;
pub use locator::ResourceLocator;
pub use locator::classpath::{ClasspathResourceProvider, EmbeddedResources};
pub use registry::{BuiltinLibraries, LoadedFeatures};
pub use require_lock::{LockOutcome, RequireLockTable};
pub use search::host::{HostClassResolver, HostClassTable, NoHostClasses};
pub use search::{SearchFlow, SearchOutcome, SearchPipeline, SearchRequest, SearchStrategy};
pub use service::{LoadService, LoadServiceBuilder, Loader, RequireOutcome};
pub use suffix::{SuffixPolicy, SuffixRules};
pub use unit::{LoadUnit, Resource, UnitKind};

//=====================================================
// End of file
//=====================================================
