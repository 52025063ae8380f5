//=====================================================
// File: locator/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Probe single locations for a loadable resource
// Objective: Resolve a search base plus suffix list against the current
//            directory, home, explicit paths, load path entries, archives
//            and the host classpath
//=====================================================

pub mod archive;
pub mod classpath;

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::errors::LoadError;
use crate::suffix::SuffixRules;
use crate::unit::{LoadUnit, Resource};

use self::archive::{ArchiveCache, ArchiveLocator, entry_locator, is_archive_url, looks_like_archive};
use self::classpath::{
    ClasspathResourceProvider, classpath_name, is_filesystem_absolute, join_entry,
    looks_like_classpath, strip_scheme,
};

/// Probes locations for resources. Every probe returns the first match in
/// suffix order, `Ok(None)` when nothing matched, and an error only for real
/// I/O malfunctions.
pub struct ResourceLocator {
    current_dir: PathBuf,
    home: Option<PathBuf>,
    rules: SuffixRules,
    archives: ArchiveCache,
    classpath: Arc<dyn ClasspathResourceProvider>,
    debug: bool,
}

impl ResourceLocator {
    pub fn new(
        current_dir: PathBuf,
        home: Option<PathBuf>,
        rules: SuffixRules,
        classpath: Arc<dyn ClasspathResourceProvider>,
    ) -> Self {
        Self {
            current_dir,
            home,
            rules,
            archives: ArchiveCache::new(),
            classpath,
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    pub fn rules(&self) -> &SuffixRules {
        &self.rules
    }

    pub fn archives(&self) -> &ArchiveCache {
        &self.archives
    }

    pub fn classpath(&self) -> &dyn ClasspathResourceProvider {
        self.classpath.as_ref()
    }

    //==================================================
    // Section 1.0 - Filesystem probes
    //==================================================

    /// `base + suffix` relative to the working directory.
    pub fn probe_current_dir(&self, base: &str, suffixes: &[&str]) -> Result<Option<LoadUnit>, LoadError> {
        for suffix in suffixes {
            let path = self.current_dir.join(format!("{base}{suffix}"));
            if let Some(unit) = self.probe_file("resourceFromCWD", &path)? {
                return Ok(Some(unit));
            }
        }
        Ok(None)
    }

    /// `./name` forms, resolved against the working directory.
    pub fn probe_dot_slash(&self, base: &str, suffixes: &[&str]) -> Result<Option<LoadUnit>, LoadError> {
        for suffix in suffixes {
            if let Some(unit) = self.probe_as_is(&format!("{base}{suffix}"))? {
                return Ok(Some(unit));
            }
        }
        Ok(None)
    }

    /// `~/name` forms, resolved against the configured home directory.
    pub fn probe_home(&self, base: &str, suffixes: &[&str]) -> Result<Option<LoadUnit>, LoadError> {
        let Some(home) = self.home.as_deref() else {
            return Ok(None);
        };
        let rest = base.strip_prefix("~/").unwrap_or(base);
        for suffix in suffixes {
            let path = home.join(format!("{rest}{suffix}"));
            if let Some(unit) = self.probe_file("resourceFromHome", &path)? {
                return Ok(Some(unit));
            }
        }
        Ok(None)
    }

    /// An absolute or working-directory relative name, without the load path.
    pub fn probe_as_is(&self, name: &str) -> Result<Option<LoadUnit>, LoadError> {
        let path = Path::new(name);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir.join(path)
        };
        self.probe_file("resourceAsIs", &path)
    }

    /// `name` below one load path entry. Archive-style and classpath-style
    /// entries are dispatched to their own probes.
    pub fn probe_load_path_entry(&self, entry: &str, name: &str) -> Result<Option<LoadUnit>, LoadError> {
        if entry.is_empty() || entry == "." {
            return self.probe_file("resourceFromCWD", &self.current_dir.join(name));
        }
        if looks_like_classpath(entry) {
            return self.probe_classpath_entry(entry, name);
        }
        if looks_like_archive(entry) {
            return self.probe_archive(entry, name);
        }
        let dir = self.resolve_dir(entry);
        self.probe_file("resourceFromLoadPath", &dir.join(name))
    }

    fn probe_file(&self, what: &str, path: &Path) -> Result<Option<LoadUnit>, LoadError> {
        let path = normalize_path(path);
        self.trying(what, &path.display());
        if !readable_file(&path)? {
            return Ok(None);
        }
        let canonical = path.display().to_string().replace('\\', "/");
        self.found(what, &canonical);
        let resource = Resource::file(canonical.clone(), path);
        LoadUnit::from_resource(resource, canonical, &self.rules, false).map(Some)
    }

    fn resolve_dir(&self, entry: &str) -> PathBuf {
        if let (Some(rest), Some(home)) = (entry.strip_prefix("~/"), self.home.as_deref()) {
            return home.join(rest);
        }
        let dir = Path::new(entry);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.current_dir.join(dir)
        }
    }

    //==================================================
    // Section 2.0 - Archive probes
    //==================================================

    /// `name` inside the archive addressed by `locator`. Malformed locators
    /// find nothing.
    pub fn probe_archive(&self, locator: &str, name: &str) -> Result<Option<LoadUnit>, LoadError> {
        let Some(locator) = ArchiveLocator::parse(locator) else {
            return Ok(None);
        };
        let entry = locator.entry_for(name);
        self.probe_archive_entry(&locator.archive, &entry)
    }

    /// Names that are themselves archive URLs (`jar:file:/x.jar!/lib/a`).
    pub fn probe_archive_url(&self, base: &str, suffixes: &[&str]) -> Result<Option<LoadUnit>, LoadError> {
        if !is_archive_url(base) {
            return Ok(None);
        }
        for suffix in suffixes {
            let named = format!("{base}{suffix}");
            let Some(locator) = ArchiveLocator::parse(&named) else {
                return Ok(None);
            };
            if locator.entry.is_empty() {
                continue;
            }
            let entry = archive::normalize_entry(&locator.entry);
            if let Some(unit) = self.probe_archive_entry(&locator.archive, &entry)? {
                return Ok(Some(unit));
            }
        }
        Ok(None)
    }

    fn probe_archive_entry(&self, archive: &str, entry: &str) -> Result<Option<LoadUnit>, LoadError> {
        let archive_path = normalize_path(&self.resolve_dir(archive));
        self.trying("resourceFromJarURL", &format!("{}!/{entry}", archive_path.display()));
        let Some(archive) = self.archives.get_or_open(&archive_path)? else {
            return Ok(None);
        };
        if !archive.contains(entry) {
            return Ok(None);
        }
        let canonical = entry_locator(archive.path(), entry);
        self.found("resourceFromJarURL", &canonical);
        let resource = Resource::archive_entry(canonical.clone(), archive, entry);
        LoadUnit::from_resource(resource, canonical, &self.rules, false).map(Some)
    }

    //==================================================
    // Section 3.0 - Classpath probes
    //==================================================

    /// `entry/name` on the host classpath, or `name` alone for an empty entry.
    pub fn probe_classpath_entry(&self, entry: &str, name: &str) -> Result<Option<LoadUnit>, LoadError> {
        let entry = strip_scheme(entry).unwrap_or(entry);
        self.probe_classpath(&join_entry(entry, name))
    }

    /// One classpath path, as given.
    pub fn probe_classpath(&self, path: &str) -> Result<Option<LoadUnit>, LoadError> {
        self.trying("fileInClasspath", &path);
        let Some(resource) = self.classpath.resolve(path) else {
            return Ok(None);
        };
        let canonical = classpath_name(path);
        self.found("fileInClasspath", &canonical);
        LoadUnit::from_resource(resource, canonical, &self.rules, true).map(Some)
    }

    /// Search the classpath for `name`: first below each relative load path
    /// entry, then as a bare name.
    pub fn find_in_classpath(&self, name: &str, load_path: &[String]) -> Result<Option<LoadUnit>, LoadError> {
        if let Some(rest) = name.strip_prefix("classpath:/") {
            return self.probe_classpath(rest);
        }
        let name = name.strip_prefix("classpath:").unwrap_or(name);

        for entry in load_path {
            if entry.is_empty() || is_filesystem_absolute(entry) {
                continue;
            }
            let entry = strip_scheme(entry).unwrap_or(entry);
            if entry.is_empty() || looks_like_archive(entry) {
                continue;
            }
            let entry_name = name
                .strip_prefix(entry)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(name);
            if let Some(unit) = self.probe_classpath(&join_entry(entry, entry_name))? {
                return Ok(Some(unit));
            }
        }

        if name.is_empty() || is_filesystem_absolute(name) {
            return Ok(None);
        }
        self.probe_classpath(name)
    }

    fn trying(&self, what: &str, target: &dyn std::fmt::Display) {
        if self.debug {
            debug!(probe = what, "trying {target}");
        }
    }

    fn found(&self, what: &str, target: &str) {
        if self.debug {
            debug!(probe = what, "found {target}");
        }
    }
}

/// True when `path` is an existing, readable regular file. Absence and
/// permission problems are "no"; other failures are propagated.
pub fn readable_file(path: &Path) -> Result<bool, LoadError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if is_absent(&err) => return Ok(false),
        Err(err) => return Err(LoadError::io(path.display(), err)),
    };
    if !metadata.is_file() {
        return Ok(false);
    }
    match File::open(path) {
        Ok(_) => Ok(true),
        Err(err) if is_absent(&err) => Ok(false),
        Err(err) => Err(LoadError::io(path.display(), err)),
    }
}

fn is_absent(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound
            | io::ErrorKind::PermissionDenied
            | io::ErrorKind::NotADirectory
            | io::ErrorKind::InvalidInput
    )
}

/// Lexically fold `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::classpath::EmbeddedResources;
    use crate::unit::UnitKind;

    fn locator(cwd: &Path) -> ResourceLocator {
        ResourceLocator::new(
            cwd.to_path_buf(),
            None,
            SuffixRules::default(),
            Arc::new(EmbeddedResources::new()),
        )
    }

    #[test]
    fn current_dir_probe_respects_suffix_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("foo.rb"), "").unwrap();
        fs::write(dir.path().join("foo.jar"), "").unwrap();
        let unit = locator(dir.path())
            .probe_current_dir("foo", &[".rb", ".jar"])
            .unwrap()
            .unwrap();
        assert_eq!(unit.kind(), UnitKind::SourceScript);
        assert!(unit.canonical_name().ends_with("/foo.rb"));
    }

    #[test]
    fn directories_are_not_resources() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("foo.rb")).unwrap();
        assert!(locator(dir.path())
            .probe_current_dir("foo", &[".rb"])
            .unwrap()
            .is_none());
    }

    #[test]
    fn parent_relative_names_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("top.rb"), "").unwrap();
        let unit = locator(&sub).probe_as_is("../top.rb").unwrap().unwrap();
        assert_eq!(
            unit.canonical_name(),
            normalize_path(&dir.path().join("top.rb")).display().to_string()
        );
    }

    #[test]
    fn home_probe_without_home_finds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(locator(dir.path())
            .probe_home("~/foo", &[".rb"])
            .unwrap()
            .is_none());
    }

    #[test]
    fn classpath_search_tries_relative_entries_then_bare_name() {
        let resources = Arc::new(EmbeddedResources::new());
        resources.insert("lib/util.rb", b"".to_vec());
        resources.insert("bare.rb", b"".to_vec());
        let locator = ResourceLocator::new(PathBuf::from("/"), None, SuffixRules::default(), resources);
        let load_path = vec!["/abs".to_string(), "classpath:/lib".to_string()];

        let unit = locator.find_in_classpath("util.rb", &load_path).unwrap().unwrap();
        assert_eq!(unit.canonical_name(), "classpath:/lib/util.rb");
        assert_eq!(unit.kind(), UnitKind::ClasspathResource);

        let unit = locator.find_in_classpath("bare.rb", &load_path).unwrap().unwrap();
        assert_eq!(unit.canonical_name(), "classpath:/bare.rb");
        assert!(locator.find_in_classpath("/bare.rb", &load_path).unwrap().is_none());
    }

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    }
}

//=====================================================
// End of file
//=====================================================
