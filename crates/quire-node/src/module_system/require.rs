// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CommonJS require() implementation
//!
//! [`ModuleScope`] is what a compiler sees while a module body runs: the
//! wrapper arguments (`module`, `exports`, `__filename`, `__dirname`) and a
//! way to get the module's [`Require`] binding.

use crate::diagnostics::Diagnostics;
use crate::error::{LoaderError, Result};
use crate::module_system::loader::ExtensionTable;
use crate::module_system::module::{Module, ModuleId};
use crate::module_system::resolver::{ResolveOptions, Resolved};
use crate::runtime::ModuleRuntime;
use crate::value::Value;
use quire_macros::defer;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Access to a module while its body runs
pub struct ModuleScope<'rt> {
    runtime: &'rt mut ModuleRuntime,
    module: ModuleId,
}

impl<'rt> ModuleScope<'rt> {
    pub(crate) fn new(runtime: &'rt mut ModuleRuntime, module: ModuleId) -> Self {
        Self { runtime, module }
    }

    /// Registry handle of the running module
    pub fn module_id(&self) -> ModuleId {
        self.module
    }

    /// The running module's record
    pub fn module(&self) -> Option<&Module> {
        self.runtime.module(self.module)
    }

    /// `__filename`
    pub fn filename(&self) -> &Path {
        self.module().map_or(Path::new(""), Module::filename)
    }

    /// `__dirname`
    pub fn dirname(&self) -> &Path {
        self.module().map_or(Path::new(""), Module::directory)
    }

    /// Current `module.exports`
    pub fn exports(&self) -> Value {
        self.module()
            .map(|m| m.exports().clone())
            .unwrap_or(Value::Undefined)
    }

    /// Assign `module.exports`
    pub fn set_exports(&mut self, exports: impl Into<Value>) {
        self.runtime.set_exports(self.module, exports.into());
    }

    /// The module's `require`
    pub fn require(&mut self) -> Require<'_> {
        Require::new(&mut *self.runtime, Some(self.module))
    }

    /// Warning sink
    pub fn diagnostics(&self) -> &Diagnostics {
        self.runtime.diagnostics()
    }

    /// The runtime the module is loading in
    pub fn runtime(&mut self) -> &mut ModuleRuntime {
        &mut *self.runtime
    }
}

/// A `require` function bound to a requester (or to none, for top-level
/// requests).
pub struct Require<'rt> {
    runtime: &'rt mut ModuleRuntime,
    module: Option<ModuleId>,
}

impl<'rt> Require<'rt> {
    pub(crate) fn new(runtime: &'rt mut ModuleRuntime, module: Option<ModuleId>) -> Self {
        Self { runtime, module }
    }

    /// The requester
    pub fn module(&self) -> Option<ModuleId> {
        self.module
    }

    /// `require(request)`
    pub fn call(&mut self, request: &str) -> Result<Value> {
        if request.is_empty() {
            return Err(LoaderError::InvalidArgValue {
                name: "id",
                value: String::new(),
                reason: "must be a non-empty string",
            });
        }

        let stat_cache = Arc::clone(self.runtime.resolver().stat_cache());
        stat_cache.enter();
        defer!(stat_cache.leave());

        self.runtime.load(request, self.module, false)
    }

    /// `require(value)` with an untyped argument, as a script would call it
    pub fn call_value(&mut self, request: &Value) -> Result<Value> {
        match request {
            Value::String(request) => self.call(request),
            other => Err(LoaderError::InvalidArgType {
                name: "id",
                received: other.describe(),
            }),
        }
    }

    /// `require.resolve(request, options)`
    pub fn resolve(&self, request: &str, options: Option<&ResolveOptions>) -> Result<Resolved> {
        self.runtime.resolve(request, self.module, options)
    }

    /// `require.resolve.paths(request)`; `None` for built-ins
    pub fn resolve_paths(&self, request: &str) -> Option<Vec<PathBuf>> {
        self.runtime.lookup_paths(request, self.module)
    }

    /// `require.extensions`
    pub fn extensions(&self) -> &ExtensionTable {
        self.runtime.extensions()
    }

    /// Mutable `require.extensions`
    pub fn extensions_mut(&mut self) -> &mut ExtensionTable {
        self.runtime.extensions_mut()
    }

    /// Keys of `require.cache`, in insertion order
    pub fn cache(&self) -> &[PathBuf] {
        self.runtime.registry().filenames()
    }

    /// `require.cache[filename]`
    pub fn cached(&self, filename: &Path) -> Option<&Module> {
        let id = self.runtime.registry().lookup(filename)?;
        self.runtime.module(id)
    }

    /// `delete require.cache[filename]`
    pub fn delete(&mut self, filename: &Path) -> bool {
        self.runtime.delete_cached(filename)
    }

    /// `require.main`
    pub fn main(&self) -> Option<&Module> {
        self.runtime.main_module()
    }
}
