// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Resolution caches for require()

use crate::host::{FileKind, FileSystem};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Memoized `(request, lookup paths) → filename` results.
///
/// Only successful lookups are stored, so a file created after a failed
/// lookup is found on the next attempt. Entries are never evicted.
#[derive(Debug, Default)]
pub struct PathCache {
    cache: DashMap<String, PathBuf>,
}

impl PathCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a request searched in `paths`
    pub fn key(request: &str, paths: &[PathBuf]) -> String {
        let mut key = String::from(request);
        for path in paths {
            key.push('\0');
            key.push_str(&path.to_string_lossy());
        }
        key
    }

    /// Get a cached filename
    pub fn get(&self, key: &str) -> Option<PathBuf> {
        self.cache.get(key).map(|entry| entry.clone())
    }

    /// Record a resolved filename
    pub fn set(&self, key: String, filename: PathBuf) {
        self.cache.insert(key, filename);
    }

    /// Get the number of cached lookups
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Fast path for requests issued by a known parent:
/// `(parent directory, request) → filename`.
#[derive(Debug, Default)]
pub struct RelativeResolveCache {
    cache: DashMap<String, PathBuf>,
}

impl RelativeResolveCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for `request` issued from a module in `parent_dir`
    pub fn key(parent_dir: &Path, request: &str) -> String {
        format!("{}\0{}", parent_dir.display(), request)
    }

    /// Get a cached filename
    pub fn get(&self, key: &str) -> Option<PathBuf> {
        self.cache.get(key).map(|entry| entry.clone())
    }

    /// Record a filename
    pub fn set(&self, key: String, filename: PathBuf) {
        self.cache.insert(key, filename);
    }

    /// Remove one entry
    pub fn delete(&self, key: &str) -> Option<PathBuf> {
        self.cache.remove(key).map(|(_, v)| v)
    }

    /// Remove every entry pointing at `filename`
    pub fn forget(&self, filename: &Path) {
        self.cache.retain(|_, cached| cached != filename);
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Short-lived `stat` cache that only exists while a `require` call is
/// on the stack.
///
/// The cache is created when the depth goes from 0 to 1 and dropped when
/// it returns to 0. A miss always asks the filesystem.
#[derive(Debug, Default)]
pub struct StatCache {
    depth: AtomicUsize,
    entries: Mutex<Option<HashMap<PathBuf, Option<FileKind>>>>,
}

impl StatCache {
    /// Create an inactive cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter one level of `require`
    pub fn enter(&self) {
        if self.depth.fetch_add(1, Ordering::SeqCst) == 0 {
            *self.entries.lock() = Some(HashMap::new());
        }
    }

    /// Leave one level of `require`
    pub fn leave(&self) {
        if self.depth.fetch_sub(1, Ordering::SeqCst) == 1 {
            *self.entries.lock() = None;
        }
    }

    /// Current `require` nesting depth
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Whether results are currently being cached
    pub fn is_active(&self) -> bool {
        self.entries.lock().is_some()
    }

    /// `stat` through the cache
    pub fn stat(&self, fs: &dyn FileSystem, path: &Path) -> Option<FileKind> {
        if let Some(hit) = self
            .entries
            .lock()
            .as_ref()
            .and_then(|entries| entries.get(path).copied())
        {
            return hit;
        }

        let result = fs.stat(path);
        if let Some(entries) = self.entries.lock().as_mut() {
            entries.insert(path.to_path_buf(), result);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryFileSystem;

    #[test]
    fn test_path_cache_key() {
        let key = PathCache::key("lodash", &[PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(key, "lodash\0/a\0/b");
    }

    #[test]
    fn test_relative_cache_forget() {
        let cache = RelativeResolveCache::new();
        cache.set(RelativeResolveCache::key(Path::new("/app"), "./a"), "/app/a.js".into());
        cache.set(RelativeResolveCache::key(Path::new("/app/lib"), "../a"), "/app/a.js".into());
        cache.set(RelativeResolveCache::key(Path::new("/app"), "./b"), "/app/b.js".into());
        cache.forget(Path::new("/app/a.js"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("/app\0./b"), Some(PathBuf::from("/app/b.js")));
    }

    #[test]
    fn test_stat_cache_lifetime() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/app/a.js", "");
        let cache = StatCache::new();

        assert!(!cache.is_active());
        cache.enter();
        cache.enter();
        assert_eq!(cache.stat(&fs, Path::new("/app/a.js")), Some(FileKind::File));

        // Cached while active, even though the file is gone now
        fs.remove_file("/app/a.js");
        assert_eq!(cache.stat(&fs, Path::new("/app/a.js")), Some(FileKind::File));

        cache.leave();
        assert!(cache.is_active());
        cache.leave();
        assert!(!cache.is_active());
        assert_eq!(cache.stat(&fs, Path::new("/app/a.js")), None);
    }
}
