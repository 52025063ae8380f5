//==============================================
// File: tests/util.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Shared fixtures for load service integration tests
// Objective: Recording loaders, temp library trees, archives and services
//            pinned to explicit home/working directories
//==============================================
#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use solvra_load::{
    LoadService, LoadServiceConfig, LoadUnit, Loader, LoaderError, UnitKind,
};

type Hook = Box<dyn Fn(&LoadService, &LoadUnit) -> Result<(), LoaderError> + Send + Sync>;

/// One loader invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadCall {
    pub kind: UnitKind,
    pub canonical_name: String,
    pub wrap: bool,
}

/// Loader that records every unit and optionally runs a hook.
#[derive(Default)]
pub struct RecordingLoader {
    calls: Mutex<Vec<LoadCall>>,
    delay: Option<Duration>,
    hook: Option<Hook>,
}

impl RecordingLoader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sleep inside every load, widening race windows.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn with_hook<F>(hook: F) -> Arc<Self>
    where
        F: Fn(&LoadService, &LoadUnit) -> Result<(), LoaderError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            hook: Some(Box::new(hook)),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<LoadCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn names(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|call| call.canonical_name.clone())
            .collect()
    }
}

impl Loader for RecordingLoader {
    fn load(&self, service: &LoadService, unit: LoadUnit, wrap: bool) -> Result<(), LoaderError> {
        self.calls.lock().push(LoadCall {
            kind: unit.kind(),
            canonical_name: unit.canonical_name().to_string(),
            wrap,
        });
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        match &self.hook {
            Some(hook) => hook(service, &unit),
            None => Ok(()),
        }
    }
}

/// Config pinned to `dir` for both home and working directory.
pub fn config_in(dir: &Path) -> LoadServiceConfig {
    LoadServiceConfig {
        current_dir: Some(dir.to_path_buf()),
        home: Some(dir.to_path_buf()),
        ..LoadServiceConfig::default()
    }
}

pub fn service_with(config: LoadServiceConfig, loader: Arc<RecordingLoader>) -> LoadService {
    let service = LoadService::builder(loader)
        .config(config)
        .env(|_| None)
        .build()
        .expect("build load service");
    service.init(Vec::<String>::new());
    service
}

/// Service rooted at `dir` with `dir` as its only load path entry.
pub fn service_in(dir: &Path, loader: Arc<RecordingLoader>) -> LoadService {
    let service = service_with(config_in(dir), loader);
    service.add_path(&path_str(dir));
    service
}

pub fn path_str(path: &Path) -> String {
    path.display().to_string()
}

/// Write `contents` at `dir/relative`, creating parent directories.
pub fn write_file(dir: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture dirs");
    }
    fs::write(&path, contents).expect("write fixture");
    path
}

/// Build a zip archive at `path` holding `entries`.
pub fn write_jar(path: &Path, entries: &[(&str, &str)]) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create archive dir");
    }
    let file = fs::File::create(path).expect("create archive");
    let mut zip = zip::ZipWriter::new(file);
    for (name, contents) in entries {
        zip.start_file(*name, zip::write::FileOptions::default())
            .expect("start archive entry");
        zip.write_all(contents.as_bytes()).expect("write archive entry");
    }
    zip.finish().expect("finish archive");
    path.to_path_buf()
}

//==============================================
// End of file
//==============================================
