// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The set of live modules, keyed by canonical filename

use crate::diagnostics::Diagnostics;
use crate::module_system::cache::RelativeResolveCache;
use crate::module_system::circular;
use crate::module_system::module::{Module, ModuleId};
use crate::value::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Module arena plus the filename and relative-request caches.
///
/// Records are never moved; a record removed after a failed load leaves an
/// empty slot so that stale handles simply stop resolving.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<Option<Module>>,
    by_filename: HashMap<PathBuf, ModuleId>,
    detached: HashMap<PathBuf, ModuleId>,
    order: Vec<PathBuf>,
    relative: RelativeResolveCache,
    main: Option<ModuleId>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A module record by handle
    pub fn get(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.index()).and_then(Option::as_ref)
    }

    /// A mutable module record by handle
    pub fn get_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// The cached module for `filename`
    pub fn lookup(&self, filename: &Path) -> Option<ModuleId> {
        self.by_filename.get(filename).copied()
    }

    /// Create a record for `filename` and cache it immediately, before any
    /// code runs, so that a cycle finds this same record.
    pub fn insert(&mut self, filename: PathBuf, parent: Option<ModuleId>) -> ModuleId {
        let id = ModuleId::new(self.modules.len());
        self.modules.push(Some(Module::new(id, filename.clone(), parent)));
        if let Some(parent) = parent.and_then(|p| self.get_mut(p)) {
            parent.push_child(id);
        }
        self.order.retain(|f| *f != filename);
        self.order.push(filename.clone());
        self.by_filename.insert(filename, id);
        id
    }

    /// A loaded record for `filename` that is never cached. It only serves
    /// as the requester of a `createRequire`-style binding; one record per
    /// filename is shared by every such binding.
    pub fn detached(&mut self, filename: PathBuf) -> ModuleId {
        if let Some(&id) = self.detached.get(&filename) {
            return id;
        }
        let id = ModuleId::new(self.modules.len());
        let module = Module::new(id, filename.clone(), None);
        module.load_state().mark_loaded();
        self.modules.push(Some(module));
        self.detached.insert(filename, id);
        id
    }

    /// Record that `parent` required `child` (idempotent)
    pub fn add_child(&mut self, parent: Option<ModuleId>, child: ModuleId) {
        if let Some(parent) = parent.and_then(|p| self.get_mut(p)) {
            parent.add_child(child);
        }
    }

    /// Mark a module as loaded, dropping its circular guard for good
    pub fn finalize(&mut self, id: ModuleId) {
        if let Some(module) = self.get(id) {
            module.load_state().mark_loaded();
        }
    }

    /// Remove every trace of a module whose load failed: the filename
    /// entry, relative-cache entries and its place among its parent's
    /// children.
    pub fn evict(&mut self, id: ModuleId) -> Option<Module> {
        let module = self.modules.get_mut(id.index())?.take()?;
        let filename = module.filename().to_path_buf();

        if self.by_filename.get(&filename) == Some(&id) {
            self.by_filename.remove(&filename);
            self.order.retain(|f| *f != filename);
        }
        self.relative.forget(&filename);
        if let Some(parent) = module.parent().and_then(|p| self.get_mut(p)) {
            parent.remove_child(id);
        }
        if self.main == Some(id) {
            self.main = None;
        }

        tracing::debug!(filename = %filename.display(), "evicted module after failed load");
        Some(module)
    }

    /// Mark `id` as the entry module (`require.main`, id `"."`)
    pub fn set_main(&mut self, id: ModuleId) {
        if let Some(module) = self.get_mut(id) {
            module.mark_main();
            self.main = Some(id);
        }
    }

    /// The entry module
    pub fn main(&self) -> Option<ModuleId> {
        self.main
    }

    /// Exports as seen by a requester, guarded while the module is loading
    pub fn view_of(&self, id: ModuleId, diagnostics: &Diagnostics) -> Value {
        self.get(id)
            .map(|module| circular::view_of(module, diagnostics))
            .unwrap_or(Value::Undefined)
    }

    /// Filenames (or ids) from `from` up to the root, innermost first
    pub fn require_stack(&self, from: Option<ModuleId>) -> Vec<String> {
        let mut stack = Vec::new();
        let mut cursor = from;
        while let Some(module) = cursor.and_then(|id| self.get(id)) {
            let filename = module.filename();
            if filename.as_os_str().is_empty() {
                stack.push(module.id().to_string());
            } else {
                stack.push(filename.display().to_string());
            }
            cursor = module.parent();
        }
        stack
    }

    /// The `(parent directory, request)` fast-path cache
    pub fn relative_cache(&self) -> &RelativeResolveCache {
        &self.relative
    }

    /// Cached filenames in insertion order (`Object.keys(require.cache)`)
    pub fn filenames(&self) -> &[PathBuf] {
        &self.order
    }

    /// Iterate over cached modules in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Module> + '_ {
        self.order
            .iter()
            .filter_map(|f| self.lookup(f))
            .filter_map(|id| self.get(id))
    }

    /// `delete require.cache[filename]`: the next require reloads the file.
    ///
    /// The record itself stays reachable through existing handles, as a
    /// parent's `children` still refer to it.
    pub fn delete(&mut self, filename: &Path) -> bool {
        if self.by_filename.remove(filename).is_some() {
            self.order.retain(|f| f != filename);
            true
        } else {
            false
        }
    }

    /// Number of cached modules
    pub fn len(&self) -> usize {
        self.by_filename.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.by_filename.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_links_parent() {
        let mut registry = ModuleRegistry::new();
        let main = registry.insert(PathBuf::from("/app/index.js"), None);
        let child = registry.insert(PathBuf::from("/app/a.js"), Some(main));
        registry.add_child(Some(main), child);

        assert_eq!(registry.get(main).unwrap().children(), &[child]);
        assert_eq!(registry.lookup(Path::new("/app/a.js")), Some(child));
        assert_eq!(
            registry.require_stack(Some(child)),
            vec!["/app/a.js".to_string(), "/app/index.js".to_string()]
        );
    }

    #[test]
    fn test_evict_leaves_no_trace() {
        let mut registry = ModuleRegistry::new();
        let main = registry.insert(PathBuf::from("/app/index.js"), None);
        let child = registry.insert(PathBuf::from("/app/bad.js"), Some(main));
        registry
            .relative_cache()
            .set(RelativeResolveCache::key(Path::new("/app"), "./bad"), "/app/bad.js".into());

        assert!(registry.evict(child).is_some());
        assert!(registry.get(child).is_none());
        assert!(registry.lookup(Path::new("/app/bad.js")).is_none());
        assert!(registry.get(main).unwrap().children().is_empty());
        assert!(registry.relative_cache().is_empty());
        assert_eq!(registry.filenames(), &[PathBuf::from("/app/index.js")]);
    }

    #[test]
    fn test_main_and_delete() {
        let mut registry = ModuleRegistry::new();
        let main = registry.insert(PathBuf::from("/app/index.js"), None);
        registry.set_main(main);
        assert_eq!(registry.main(), Some(main));
        assert_eq!(registry.get(main).unwrap().id(), ".");

        assert!(registry.delete(Path::new("/app/index.js")));
        assert!(!registry.delete(Path::new("/app/index.js")));
        assert!(registry.is_empty());
        assert!(registry.get(main).is_some());
    }

    #[test]
    fn test_detached_is_not_cached() {
        let mut registry = ModuleRegistry::new();
        let id = registry.detached(PathBuf::from("/app/tool.js"));
        assert!(registry.get(id).unwrap().is_loaded());
        assert!(registry.lookup(Path::new("/app/tool.js")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_finalize() {
        let mut registry = ModuleRegistry::new();
        let id = registry.insert(PathBuf::from("/app/a.js"), None);
        let diagnostics = Diagnostics::new();
        assert!(matches!(registry.view_of(id, &diagnostics), Value::Partial(_)));
        registry.finalize(id);
        assert!(registry.get(id).unwrap().is_loaded());
        assert!(matches!(registry.view_of(id, &diagnostics), Value::Object(_)));
    }

    #[test]
    fn test_detached_record_is_shared() {
        let mut registry = ModuleRegistry::new();
        let first = registry.detached(PathBuf::from("/app/tools/cli.js"));
        let second = registry.detached(PathBuf::from("/app/tools/cli.js"));
        let other = registry.detached(PathBuf::from("/app/other.js"));

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert!(registry.get(first).unwrap().is_loaded());
        assert!(registry.lookup(Path::new("/app/tools/cli.js")).is_none());
        assert!(registry.is_empty());
    }
}
