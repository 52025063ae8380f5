//=====================================================
// File: locator/archive.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Packaged-archive access for archive-style load path entries
// Objective: Parse `archive!/entry` locators and keep one open handle per archive
//=====================================================

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::errors::LoadError;

//==================================================
// Section 1.0 - Locators
//==================================================

/// `jar:file:/libs/a.jar!/lib` split into archive file and entry prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLocator {
    pub archive: String,
    pub entry: String,
}

impl ArchiveLocator {
    /// Parse a locator. Returns `None` when no archive path can be recovered.
    pub fn parse(locator: &str) -> Option<Self> {
        let (archive, entry) = match locator.find('!') {
            Some(idx) => {
                let rest = &locator[idx + 1..];
                let entry = rest.strip_prefix('/').unwrap_or(rest);
                (&locator[..idx], entry)
            }
            None => (locator, ""),
        };
        let archive = archive.strip_prefix("jar:").unwrap_or(archive);
        let archive = archive.strip_prefix("file:").unwrap_or(archive);
        if archive.is_empty() {
            return None;
        }
        Some(Self {
            archive: archive.to_string(),
            entry: entry.trim_end_matches('/').to_string(),
        })
    }

    /// Entry path of `name` below this locator's prefix.
    pub fn entry_for(&self, name: &str) -> String {
        if self.entry.is_empty() {
            normalize_entry(name)
        } else {
            normalize_entry(&format!("{}/{}", self.entry, name))
        }
    }
}

/// Load path entries that address an archive rather than a directory.
pub fn looks_like_archive(entry: &str) -> bool {
    entry.starts_with("jar:")
        || entry.ends_with(".jar")
        || entry.contains(".jar!")
        || (entry.starts_with("file:") && entry.contains('!'))
}

/// Names that address an archive entry directly.
pub fn is_archive_url(name: &str) -> bool {
    name.starts_with("jar:") || (name.starts_with("file:") && name.contains("!/"))
}

/// Drop `.` segments and fold `seg/..` pairs. Archive entries never start with `/`.
pub fn normalize_entry(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Canonical locator text for an entry.
pub fn entry_locator(archive: &Path, entry: &str) -> String {
    format!("file:{}!/{}", archive.display(), entry)
}

//==================================================
// Section 2.0 - Archive handles
//==================================================

// Header sizes are untrusted; larger entries grow while reading.
const READ_HINT_LIMIT: u64 = 1 << 20;

/// An opened archive with its entry index.
pub struct Archive {
    path: PathBuf,
    entries: HashSet<String>,
    zip: Mutex<ZipArchive<File>>,
}

impl fmt::Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl Archive {
    /// Open `path`. A missing file is `Ok(None)`; anything else that stops
    /// the archive from opening is an error.
    pub fn open(path: &Path) -> Result<Option<Self>, LoadError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => return Ok(None),
            Err(err) => return Err(LoadError::io(path.display(), err)),
        };
        if !file
            .metadata()
            .map_err(|err| LoadError::io(path.display(), err))?
            .is_file()
        {
            return Ok(None);
        }
        let zip = ZipArchive::new(file).map_err(|source| LoadError::Archive {
            path: path.to_path_buf(),
            source,
        })?;
        let entries = zip.file_names().map(str::to_string).collect();
        Ok(Some(Self {
            path: path.to_path_buf(),
            entries,
            zip: Mutex::new(zip),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn read_entry(&self, entry: &str) -> io::Result<Vec<u8>> {
        let mut zip = self.zip.lock();
        let mut file = zip.by_name(entry).map_err(|err| match err {
            ZipError::Io(err) => err,
            ZipError::FileNotFound => io::Error::new(io::ErrorKind::NotFound, entry.to_string()),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        })?;
        let mut bytes = Vec::with_capacity(file.size().min(READ_HINT_LIMIT) as usize);
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

/// Archive handles keyed by archive path.
#[derive(Debug, Default)]
pub struct ArchiveCache {
    archives: RwLock<HashMap<PathBuf, Arc<Archive>>>,
}

impl ArchiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached handle for `path`, opening it on first use. Two
    /// threads racing on the same path both open it; the first insert wins
    /// and both get that handle back.
    pub fn get_or_open(&self, path: &Path) -> Result<Option<Arc<Archive>>, LoadError> {
        if let Some(archive) = self.archives.read().get(path) {
            return Ok(Some(archive.clone()));
        }
        let Some(opened) = Archive::open(path)? else {
            return Ok(None);
        };
        let mut archives = self.archives.write();
        let retained = archives
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(opened));
        Ok(Some(retained.clone()))
    }

    pub fn len(&self) -> usize {
        self.archives.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.read().is_empty()
    }
}


//=====================================================
// End of file
//=====================================================
