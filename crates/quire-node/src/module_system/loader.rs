// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module loader - dispatches a resolved file to its compiler

use crate::error::{LoaderError, Result};
use crate::host::WrappedSource;
use crate::module_system::module::ModuleId;
use crate::module_system::package::{PackageType, strip_bom};
use crate::module_system::path::dirname;
use crate::module_system::require::ModuleScope;
use crate::runtime::ModuleRuntime;
use crate::value::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Native addon that is known not to work and fails fast
const UNSUPPORTED_ADDONS: &[(&str, &str)] = &[("cpufeatures.node", "cpu-features")];

/// A compiler registered for a custom extension
pub trait CustomCompiler: Send + Sync {
    /// Compile the scope's module, typically by reading its file and
    /// assigning `module.exports`
    fn compile(&self, scope: &mut ModuleScope<'_>) -> Result<()>;
}

impl<F> CustomCompiler for F
where
    F: Fn(&mut ModuleScope<'_>) -> Result<()> + Send + Sync,
{
    fn compile(&self, scope: &mut ModuleScope<'_>) -> Result<()> {
        self(scope)
    }
}

/// How files with a given extension are compiled
#[derive(Clone)]
pub enum Compiler {
    /// CommonJS source; the nearest package.json "type" may make it ESM
    Js,
    /// CommonJS source regardless of package "type"
    Cjs,
    /// JSON data
    Json,
    /// ES module through the host importer
    Mjs,
    /// Native addon
    Node,
    /// Host-registered compiler
    Custom(Arc<dyn CustomCompiler>),
}

impl Compiler {
    /// Wrap a custom compiler
    pub fn custom(compiler: impl CustomCompiler + 'static) -> Self {
        Compiler::Custom(Arc::new(compiler))
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compiler::Js => write!(f, "Js"),
            Compiler::Cjs => write!(f, "Cjs"),
            Compiler::Json => write!(f, "Json"),
            Compiler::Mjs => write!(f, "Mjs"),
            Compiler::Node => write!(f, "Node"),
            Compiler::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Ordered `extension → compiler` table (`require.extensions`).
///
/// The order is also the probe order when a request omits its extension.
#[derive(Debug, Clone)]
pub struct ExtensionTable {
    entries: Vec<(String, Compiler)>,
}

impl ExtensionTable {
    /// The default table: `.js`, `.json`, `.node`, `.cjs`, `.mjs`
    pub fn new() -> Self {
        Self {
            entries: vec![
                (".js".to_string(), Compiler::Js),
                (".json".to_string(), Compiler::Json),
                (".node".to_string(), Compiler::Node),
                (".cjs".to_string(), Compiler::Cjs),
                (".mjs".to_string(), Compiler::Mjs),
            ],
        }
    }

    /// Register a compiler. A known extension keeps its probe position;
    /// a new one is probed last.
    pub fn register(&mut self, extension: impl Into<String>, compiler: Compiler) {
        let extension = extension.into();
        match self.entries.iter_mut().find(|(ext, _)| *ext == extension) {
            Some(entry) => entry.1 = compiler,
            None => self.entries.push((extension, compiler)),
        }
    }

    /// Remove an extension
    pub fn unregister(&mut self, extension: &str) -> Option<Compiler> {
        let index = self.entries.iter().position(|(ext, _)| ext == extension)?;
        Some(self.entries.remove(index).1)
    }

    /// Compiler for an extension
    pub fn get(&self, extension: &str) -> Option<&Compiler> {
        self.entries
            .iter()
            .find(|(ext, _)| ext == extension)
            .map(|(_, compiler)| compiler)
    }

    /// Whether an extension is registered
    pub fn contains(&self, extension: &str) -> bool {
        self.get(extension).is_some()
    }

    /// Registered extensions in probe order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(ext, _)| ext.as_str())
    }

    /// Number of registered extensions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The longest registered multi-dot suffix of `filename`
    /// (`a.test.js` tries `.test.js` then `.js`). Dotfiles keep their
    /// leading dot as part of the name. Falls back to `.js`.
    pub fn find_longest_registered_extension(&self, filename: &Path) -> String {
        let name = filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for (index, _) in name.match_indices('.') {
            if index == 0 {
                continue;
            }
            let extension = &name[index..];
            if self.contains(extension) {
                return extension.to_string();
            }
        }
        ".js".to_string()
    }
}

impl Default for ExtensionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile and run the module `id`, assigning its exports
pub(crate) fn compile(runtime: &mut ModuleRuntime, id: ModuleId, filename: &Path) -> Result<()> {
    let extension = runtime.extensions().find_longest_registered_extension(filename);
    let compiler = runtime
        .extensions()
        .get(&extension)
        .cloned()
        .unwrap_or(Compiler::Js);
    tracing::debug!(filename = %filename.display(), %extension, ?compiler, "compiling");

    match compiler {
        Compiler::Js => {
            let format = if filename.extension().is_some_and(|e| e == "js") {
                runtime
                    .resolver()
                    .packages()
                    .read_package_scope(filename)?
                    .and_then(|package| package.package_type)
            } else {
                None
            };
            compile_script(runtime, id, filename, format)
        }
        Compiler::Cjs => compile_script(runtime, id, filename, Some(PackageType::CommonJs)),
        Compiler::Json => compile_json(runtime, id, filename),
        Compiler::Mjs => import_esm(runtime, id, filename, None),
        Compiler::Node => compile_addon(runtime, id, filename),
        Compiler::Custom(custom) => custom.compile(&mut ModuleScope::new(runtime, id)),
    }
}

fn read_source(runtime: &ModuleRuntime, filename: &Path) -> Result<String> {
    runtime
        .filesystem()
        .read_to_string(filename)
        .map_err(|source| LoaderError::Io {
            path: filename.to_path_buf(),
            source,
        })
}

/// Wrapped CommonJS evaluation, or the ESM importer when the package says
/// so or the source turns out to be ESM syntax.
fn compile_script(
    runtime: &mut ModuleRuntime,
    id: ModuleId,
    filename: &Path,
    format: Option<PackageType>,
) -> Result<()> {
    let source = read_source(runtime, filename)?;
    if format == Some(PackageType::Module) {
        return import_esm(runtime, id, filename, Some(&source));
    }

    let wrapped = WrappedSource::new(filename, &dirname(filename), source);
    let engine = Arc::clone(runtime.engine());
    let result = engine.run_wrapped(&wrapped, &mut ModuleScope::new(runtime, id));

    match result {
        Err(e) if format.is_none() && e.is_esm_syntax_error() => {
            tracing::debug!(filename = %filename.display(), "retrying as ES module: {}", e);
            import_esm(runtime, id, filename, Some(&wrapped.source))
        }
        other => other,
    }
}

fn import_esm(
    runtime: &mut ModuleRuntime,
    id: ModuleId,
    filename: &Path,
    source: Option<&str>,
) -> Result<()> {
    let url = Url::from_file_path(filename).map_err(|_| LoaderError::InvalidModuleSpecifier {
        request: filename.display().to_string(),
        reason: "is not an absolute file path".to_string(),
    })?;
    let namespace = runtime.engine().import_module(&url, source)?;
    runtime.set_exports(id, namespace);
    Ok(())
}

fn compile_json(runtime: &mut ModuleRuntime, id: ModuleId, filename: &Path) -> Result<()> {
    let source = read_source(runtime, filename)?;
    let json: serde_json::Value =
        serde_json::from_str(strip_bom(&source)).map_err(|e| LoaderError::Parse {
            filename: filename.display().to_string(),
            message: e.to_string(),
        })?;
    runtime.set_exports(id, Value::from_json(&json));
    Ok(())
}

fn compile_addon(runtime: &mut ModuleRuntime, id: ModuleId, filename: &Path) -> Result<()> {
    let name = filename.to_string_lossy();
    if let Some((_, addon)) = UNSUPPORTED_ADDONS
        .iter()
        .find(|(suffix, _)| name.ends_with(suffix))
    {
        return Err(LoaderError::UnsupportedAddon(addon));
    }
    let exports = runtime.addons().open(filename)?;
    runtime.set_exports(id, exports);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_probe_order() {
        let table = ExtensionTable::new();
        assert_eq!(
            table.names().collect::<Vec<_>>(),
            vec![".js", ".json", ".node", ".cjs", ".mjs"]
        );
    }

    #[test]
    fn test_register_appends_and_replaces() {
        let mut table = ExtensionTable::new();
        table.register(".txt", Compiler::custom(|_: &mut ModuleScope<'_>| Ok(())));
        table.register(".json", Compiler::Js);
        let names: Vec<_> = table.names().collect();
        assert_eq!(names.last(), Some(&".txt"));
        assert_eq!(names[1], ".json");
        assert!(matches!(table.get(".json"), Some(Compiler::Js)));
        assert!(table.unregister(".txt").is_some());
        assert!(!table.contains(".txt"));
    }

    #[test]
    fn test_longest_registered_extension() {
        let mut table = ExtensionTable::new();
        assert_eq!(table.find_longest_registered_extension(Path::new("/a/b.json")), ".json");
        assert_eq!(table.find_longest_registered_extension(Path::new("/a/b.ts")), ".js");
        assert_eq!(table.find_longest_registered_extension(Path::new("/a/.json")), ".js");

        table.register(".test.js", Compiler::Cjs);
        assert_eq!(
            table.find_longest_registered_extension(Path::new("/a/x.test.js")),
            ".test.js"
        );
        assert_eq!(table.find_longest_registered_extension(Path::new("/a/x.min.js")), ".js");
    }
}
