//=====================================================
// File: load_path.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Ordered, process-wide list of load path entries
// Objective: Rare appends under one mutex, snapshot reads that never tear
//=====================================================

use std::sync::Arc;

use parking_lot::Mutex;

/// Ordered load path entries. Readers take an immutable snapshot; writers
/// replace the shared vector.
#[derive(Debug, Default)]
pub struct LoadPath {
    entries: Mutex<Arc<Vec<String>>>,
}

impl LoadPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let path = Self::new();
        path.extend(entries);
        path
    }

    /// Append one entry. Empty entries are dropped and `\` becomes `/`.
    pub fn push(&self, entry: &str) -> bool {
        if entry.is_empty() {
            return false;
        }
        let entry = entry.replace('\\', "/");
        let mut entries = self.entries.lock();
        Arc::make_mut(&mut entries).push(entry);
        true
    }

    pub fn extend<I, S>(&self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in entries {
            self.push(entry.as_ref());
        }
    }

    /// Insert at the front, ahead of every existing entry.
    pub fn unshift(&self, entry: &str) -> bool {
        if entry.is_empty() {
            return false;
        }
        let entry = entry.replace('\\', "/");
        let mut entries = self.entries.lock();
        Arc::make_mut(&mut entries).insert(0, entry);
        true
    }

    pub fn remove(&self, entry: &str) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        Arc::make_mut(&mut entries).retain(|existing| existing != entry);
        entries.len() != before
    }

    /// Consistent view of the entries at this instant.
    pub fn snapshot(&self) -> Arc<Vec<String>> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        *self.entries.lock() = Arc::new(Vec::new());
    }
}


//=====================================================
// End of file
//=====================================================
