// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Shared fixtures: an in-memory project and a script engine whose module
//! bodies are Rust closures.

#![allow(dead_code)]

use parking_lot::{Mutex, RwLock};
use quire_node::{
    LoaderConfig, LoaderError, MemoryFileSystem, ModuleRuntime, ModuleScope, Result, ScriptEngine,
    Value, WrappedSource,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

type Body = Arc<dyn Fn(&mut ModuleScope<'_>) -> Result<()> + Send + Sync>;

/// Engine running registered closures in place of module source
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    bodies: Arc<RwLock<HashMap<PathBuf, Body>>>,
    namespaces: Arc<RwLock<HashMap<PathBuf, Value>>>,
    runs: Arc<Mutex<Vec<PathBuf>>>,
    imports: Arc<Mutex<Vec<(PathBuf, Option<String>)>>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Body for the module at `path`
    pub fn script<F>(&self, path: &str, body: F) -> &Self
    where
        F: Fn(&mut ModuleScope<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.bodies.write().insert(PathBuf::from(path), Arc::new(body));
        self
    }

    /// Namespace returned when `path` is imported as an ES module
    pub fn namespace(&self, path: &str, namespace: Value) -> &Self {
        self.namespaces.write().insert(PathBuf::from(path), namespace);
        self
    }

    /// Files evaluated as CommonJS, in order
    pub fn runs(&self) -> Vec<PathBuf> {
        self.runs.lock().clone()
    }

    /// Files imported as ES modules, with the source handed over
    pub fn imports(&self) -> Vec<(PathBuf, Option<String>)> {
        self.imports.lock().clone()
    }
}

impl ScriptEngine for ScriptedEngine {
    fn run_wrapped(&self, source: &WrappedSource, scope: &mut ModuleScope<'_>) -> Result<()> {
        self.runs.lock().push(source.filename.clone());
        if source.source.starts_with("export ") {
            return Err(LoaderError::syntax(
                source.filename.display().to_string(),
                "Unexpected token 'export'",
            ));
        }
        let body = self.bodies.read().get(&source.filename).cloned();
        match body {
            Some(body) => body(scope),
            None => Ok(()),
        }
    }

    fn import_module(&self, url: &Url, source: Option<&str>) -> Result<Value> {
        let path = url
            .to_file_path()
            .map_err(|_| LoaderError::module_not_found(url.as_str()))?;
        self.imports
            .lock()
            .push((path.clone(), source.map(str::to_string)));
        let namespace = self.namespaces.read().get(&path).cloned();
        namespace.ok_or(LoaderError::RequireEsm(path))
    }
}

/// In-memory project rooted at `/app`
pub struct Project {
    pub fs: Arc<MemoryFileSystem>,
    pub engine: ScriptedEngine,
}

impl Project {
    pub fn new() -> Self {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_dir("/app");
        Self {
            fs,
            engine: ScriptedEngine::new(),
        }
    }

    pub fn file(&self, path: &str, contents: &str) -> &Self {
        self.fs.add_file(path, contents);
        self
    }

    pub fn runtime(&self) -> ModuleRuntime {
        self.runtime_with(LoaderConfig::with_cwd("/app"))
    }

    pub fn runtime_with(&self, config: LoaderConfig) -> ModuleRuntime {
        ModuleRuntime::builder(config)
            .filesystem(self.fs.clone())
            .engine(Arc::new(self.engine.clone()))
            .build()
    }
}

/// Filename of a resolved file request
pub fn file(path: &str) -> quire_node::Resolved {
    quire_node::Resolved::File(Path::new(path).to_path_buf())
}
