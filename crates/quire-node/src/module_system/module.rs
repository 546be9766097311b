// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module records

use crate::module_system::circular::LoadState;
use crate::module_system::path::{dirname, node_module_paths};
use crate::value::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// Handle of a module record inside its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(usize);

impl ModuleId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Arena index
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One loaded (or loading) file
#[derive(Debug)]
pub struct Module {
    handle: ModuleId,
    id: String,
    filename: PathBuf,
    directory: PathBuf,
    exports: Value,
    state: LoadState,
    parent: Option<ModuleId>,
    children: Vec<ModuleId>,
    paths: Vec<PathBuf>,
}

impl Module {
    pub(crate) fn new(handle: ModuleId, filename: PathBuf, parent: Option<ModuleId>) -> Self {
        let directory = dirname(&filename);
        let paths = node_module_paths(&directory);
        Self {
            handle,
            id: filename.display().to_string(),
            filename,
            directory,
            exports: Value::new_object(),
            state: LoadState::new(),
            parent,
            children: Vec::new(),
            paths,
        }
    }

    /// Registry handle
    pub fn handle(&self) -> ModuleId {
        self.handle
    }

    /// `module.id`: the filename, or `"."` for the entry module
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Canonical filename
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Containing directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Current `module.exports`
    pub fn exports(&self) -> &Value {
        &self.exports
    }

    /// Replace `module.exports`
    pub fn set_exports(&mut self, exports: Value) {
        self.exports = exports;
    }

    /// `module.loaded`
    pub fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    pub(crate) fn load_state(&self) -> &LoadState {
        &self.state
    }

    /// Module whose request created this one
    pub fn parent(&self) -> Option<ModuleId> {
        self.parent
    }

    /// Modules required by this one, in first-require order
    pub fn children(&self) -> &[ModuleId] {
        &self.children
    }

    /// `node_modules` lookup directories for bare requests
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Whether this is the entry module
    pub fn is_main(&self) -> bool {
        self.id == "."
    }

    pub(crate) fn mark_main(&mut self) {
        self.id = ".".to_string();
    }

    pub(crate) fn push_child(&mut self, child: ModuleId) {
        self.children.push(child);
    }

    pub(crate) fn add_child(&mut self, child: ModuleId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(crate) fn remove_child(&mut self, child: ModuleId) {
        self.children.retain(|c| *c != child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_module() {
        let module = Module::new(ModuleId::new(3), PathBuf::from("/app/lib/a.js"), None);
        assert_eq!(module.id(), "/app/lib/a.js");
        assert_eq!(module.directory(), Path::new("/app/lib"));
        assert_eq!(module.paths()[0], PathBuf::from("/app/lib/node_modules"));
        assert!(!module.is_loaded());
        assert!(module.exports().as_object().is_some_and(|o| o.is_empty()));
    }

    #[test]
    fn test_children_are_deduplicated() {
        let mut module = Module::new(ModuleId::new(0), PathBuf::from("/a.js"), None);
        module.add_child(ModuleId::new(1));
        module.add_child(ModuleId::new(2));
        module.add_child(ModuleId::new(1));
        assert_eq!(module.children(), &[ModuleId::new(1), ModuleId::new(2)]);
        module.remove_child(ModuleId::new(1));
        assert_eq!(module.children(), &[ModuleId::new(2)]);
    }
}
