// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The module runtime: resolver, registry and loader wired together

use crate::config::LoaderConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{LoaderError, Result};
use crate::host::{
    BuiltinModules, FileSystem, NativeAddonLoader, NoNativeAddons, NoScriptEngine, OsFileSystem,
    ScriptEngine,
};
use crate::module_system::path::{is_absolute_request, resolve};
use crate::module_system::{
    Compiler, ExtensionTable, Module, ModuleId, ModuleRegistry, PathResolver, RelativeResolveCache,
    Require, ResolveOptions, Resolved, compile,
};
use crate::value::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Builder for [`ModuleRuntime`]
pub struct ModuleRuntimeBuilder {
    config: LoaderConfig,
    fs: Arc<dyn FileSystem>,
    engine: Arc<dyn ScriptEngine>,
    addons: Arc<dyn NativeAddonLoader>,
    builtins: BuiltinModules,
    extensions: ExtensionTable,
    diagnostics: Diagnostics,
}

impl ModuleRuntimeBuilder {
    fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            fs: Arc::new(OsFileSystem),
            engine: Arc::new(NoScriptEngine),
            addons: Arc::new(NoNativeAddons),
            builtins: BuiltinModules::with_placeholders(),
            extensions: ExtensionTable::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Filesystem to resolve against
    pub fn filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Script engine running module bodies
    pub fn engine(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Native addon loader for `.node` files
    pub fn addons(mut self, addons: Arc<dyn NativeAddonLoader>) -> Self {
        self.addons = addons;
        self
    }

    /// Built-in module table
    pub fn builtins(mut self, builtins: BuiltinModules) -> Self {
        self.builtins = builtins;
        self
    }

    /// Register an extra compiler
    pub fn extension(mut self, extension: impl Into<String>, compiler: Compiler) -> Self {
        self.extensions.register(extension, compiler);
        self
    }

    /// Warning sink shared with the caller
    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Build the runtime
    pub fn build(self) -> ModuleRuntime {
        let resolver = PathResolver::new(
            Arc::clone(&self.fs),
            self.builtins,
            self.config,
            self.diagnostics.clone(),
        );
        ModuleRuntime {
            fs: self.fs,
            engine: self.engine,
            addons: self.addons,
            resolver,
            registry: ModuleRegistry::new(),
            extensions: self.extensions,
            diagnostics: self.diagnostics,
        }
    }
}

/// A CommonJS module system instance
pub struct ModuleRuntime {
    fs: Arc<dyn FileSystem>,
    engine: Arc<dyn ScriptEngine>,
    addons: Arc<dyn NativeAddonLoader>,
    resolver: PathResolver,
    registry: ModuleRegistry,
    extensions: ExtensionTable,
    diagnostics: Diagnostics,
}

impl ModuleRuntime {
    /// Runtime on the OS filesystem with no script engine
    pub fn new(config: LoaderConfig) -> Self {
        Self::builder(config).build()
    }

    /// Start configuring a runtime
    pub fn builder(config: LoaderConfig) -> ModuleRuntimeBuilder {
        ModuleRuntimeBuilder::new(config)
    }

    /// Load the entry module. `specifier` is a path, relative to the
    /// configured working directory unless absolute.
    pub fn load_main(&mut self, specifier: &str) -> Result<Value> {
        let request = if is_absolute_request(specifier) {
            specifier.to_string()
        } else {
            resolve(&self.resolver.config().cwd, specifier)
                .display()
                .to_string()
        };
        tracing::info!(request = %request, "loading entry module");
        self.load(&request, None, true)
    }

    /// `require(request)` outside of any module
    pub fn require(&mut self, request: &str) -> Result<Value> {
        self.make_require(None).call(request)
    }

    /// A `require` bound to `module` (or to none)
    pub fn make_require(&mut self, module: Option<ModuleId>) -> Require<'_> {
        Require::new(self, module)
    }

    /// `module.createRequire(filename)`: a requester at `filename` (relative
    /// to the working directory) that is not itself cached.
    pub fn create_require(&mut self, filename: &Path) -> ModuleId {
        let filename = resolve(&self.resolver.config().cwd, &filename.to_string_lossy());
        self.registry.detached(filename)
    }

    /// Resolve, load and cache `request` on behalf of `parent`, returning
    /// the exports the parent should see.
    pub fn load(&mut self, request: &str, parent: Option<ModuleId>, is_main: bool) -> Result<Value> {
        let relative_key = parent
            .and_then(|id| self.registry.get(id))
            .map(|module| RelativeResolveCache::key(module.directory(), request));

        if let Some(key) = &relative_key {
            if let Some(filename) = self.registry.relative_cache().get(key) {
                if let Some(id) = self.registry.lookup(&filename) {
                    tracing::trace!(request, filename = %filename.display(), "relative cache hit");
                    self.registry.add_child(parent, id);
                    return Ok(self.registry.view_of(id, &self.diagnostics));
                }
                self.registry.relative_cache().delete(key);
            }
        }

        let resolved = self.resolver.resolve_filename(
            &self.registry,
            &self.extensions,
            request,
            parent,
            is_main,
            None,
        )?;
        let filename = match resolved {
            Resolved::Builtin(name) => {
                return self
                    .resolver
                    .builtins()
                    .get(&name)
                    .ok_or(LoaderError::UnknownBuiltin(name));
            }
            Resolved::File(filename) => filename,
        };

        if let Some(id) = self.registry.lookup(&filename) {
            self.registry.add_child(parent, id);
            return Ok(self.registry.view_of(id, &self.diagnostics));
        }

        let id = self.registry.insert(filename.clone(), parent);
        if is_main {
            self.registry.set_main(id);
        }
        if let Some(key) = relative_key {
            self.registry.relative_cache().set(key, filename.clone());
        }

        tracing::debug!(request, filename = %filename.display(), "loading module");
        match compile(self, id, &filename) {
            Ok(()) => {
                self.registry.finalize(id);
                tracing::debug!(filename = %filename.display(), "module loaded");
                Ok(self
                    .registry
                    .get(id)
                    .map(|m| m.exports().clone())
                    .unwrap_or(Value::Undefined))
            }
            Err(e) => {
                tracing::debug!(filename = %filename.display(), error = %e, "module failed to load");
                self.registry.evict(id);
                Err(e)
            }
        }
    }

    /// Resolve `request` as issued by `parent` without loading it
    pub fn resolve(
        &self,
        request: &str,
        parent: Option<ModuleId>,
        options: Option<&ResolveOptions>,
    ) -> Result<Resolved> {
        self.resolver
            .resolve_filename(&self.registry, &self.extensions, request, parent, false, options)
    }

    /// Lookup directories for `request` issued by `parent`
    pub fn lookup_paths(&self, request: &str, parent: Option<ModuleId>) -> Option<Vec<PathBuf>> {
        let parent = parent.and_then(|id| self.registry.get(id));
        self.resolver.lookup_paths(request, parent)
    }

    /// A module record
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.registry.get(id)
    }

    /// The cached module for `filename`
    pub fn cached(&self, filename: &Path) -> Option<&Module> {
        self.registry.lookup(filename).and_then(|id| self.registry.get(id))
    }

    /// The entry module
    pub fn main_module(&self) -> Option<&Module> {
        self.registry.main().and_then(|id| self.registry.get(id))
    }

    /// Drop `filename` from the module cache
    pub fn delete_cached(&mut self, filename: &Path) -> bool {
        self.registry.delete(filename)
    }

    pub(crate) fn set_exports(&mut self, id: ModuleId, exports: Value) {
        if let Some(module) = self.registry.get_mut(id) {
            module.set_exports(exports);
        }
    }

    /// The module registry
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// The path resolver
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Configuration in effect
    pub fn config(&self) -> &LoaderConfig {
        self.resolver.config()
    }

    /// `require.extensions`
    pub fn extensions(&self) -> &ExtensionTable {
        &self.extensions
    }

    /// Mutable `require.extensions`
    pub fn extensions_mut(&mut self) -> &mut ExtensionTable {
        &mut self.extensions
    }

    /// Warnings emitted so far
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub(crate) fn filesystem(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub(crate) fn engine(&self) -> &Arc<dyn ScriptEngine> {
        &self.engine
    }

    pub(crate) fn addons(&self) -> &Arc<dyn NativeAddonLoader> {
        &self.addons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryFileSystem;

    fn runtime(fs: MemoryFileSystem) -> ModuleRuntime {
        ModuleRuntime::builder(LoaderConfig::with_cwd("/app"))
            .filesystem(Arc::new(fs))
            .build()
    }

    #[test]
    fn test_json_module_is_cached() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/app/data.json", "{\"answer\": 42}");
        let mut runtime = runtime(fs);

        let first = runtime.require("./data.json").unwrap();
        assert_eq!(first.get("answer"), Value::from(42));
        let second = runtime.require("./data").unwrap();
        assert!(Value::same(&first, &second));
        assert_eq!(runtime.registry().len(), 1);
        assert!(runtime.cached(Path::new("/app/data.json")).unwrap().is_loaded());
    }

    #[test]
    fn test_failed_load_is_evicted() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/app/bad.json", "{ nope");
        let mut runtime = runtime(fs);

        let err = runtime.require("./bad.json").unwrap_err();
        assert!(matches!(err, LoaderError::Parse { .. }));
        assert!(runtime.registry().is_empty());
    }

    #[test]
    fn test_builtin_bypasses_registry() {
        let mut runtime = runtime(MemoryFileSystem::new());
        let fs = runtime.require("fs").unwrap();
        assert!(Value::same(&fs, &runtime.require("node:fs").unwrap()));
        assert!(runtime.registry().is_empty());
    }

    #[test]
    fn test_create_require_resolves_from_file() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/app/tools/node_modules/dep/index.json", "[]");
        let mut runtime = runtime(fs);

        let from = runtime.create_require(Path::new("tools/cli.js"));
        assert_eq!(
            runtime.resolve("dep", Some(from), None).unwrap(),
            Resolved::File(PathBuf::from("/app/tools/node_modules/dep/index.json"))
        );
        assert!(runtime.require("dep").unwrap_err().is_not_found());
        assert!(runtime.make_require(Some(from)).call("dep").is_ok());
        assert!(runtime.cached(Path::new("/app/tools/cli.js")).is_none());
    }

    #[test]
    fn test_script_without_engine() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/app/index.js", "module.exports = 1");
        let mut runtime = runtime(fs);

        let err = runtime.load_main("index.js").unwrap_err();
        assert!(matches!(err, LoaderError::NoScriptEngine(_)));
        assert!(runtime.main_module().is_none());
    }
}
