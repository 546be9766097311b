// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Script evaluation and native addon hooks

use crate::error::{LoaderError, Result};
use crate::module_system::ModuleScope;
use crate::value::Value;
use std::path::{Path, PathBuf};
use url::Url;

/// Parameters of the CommonJS wrapper function, in order.
///
/// The first five are bound by the module system; the rest are the host's
/// fixed globals.
pub const WRAPPER_PARAMS: &[&str] = &[
    "exports",
    "require",
    "module",
    "__filename",
    "__dirname",
    "Buffer",
    "clearImmediate",
    "clearInterval",
    "clearTimeout",
    "console",
    "global",
    "process",
    "setImmediate",
    "setInterval",
    "setTimeout",
    "performance",
];

/// Source text of a CommonJS module, ready for evaluation
#[derive(Debug, Clone)]
pub struct WrappedSource {
    /// Module filename (`__filename`)
    pub filename: PathBuf,
    /// Containing directory (`__dirname`)
    pub dirname: PathBuf,
    /// Original source text
    pub source: String,
    /// Source wrapped in a function taking [`WRAPPER_PARAMS`]
    pub wrapped: String,
}

impl WrappedSource {
    /// Wrap `source` for `filename`
    pub fn new(filename: &Path, dirname: &Path, source: String) -> Self {
        let wrapped = format!(
            "(function ({}) {{ {}\n}})",
            WRAPPER_PARAMS.join(", "),
            source
        );
        Self {
            filename: filename.to_path_buf(),
            dirname: dirname.to_path_buf(),
            source,
            wrapped,
        }
    }
}

/// The evaluator behind plain-source modules.
///
/// `run_wrapped` compiles the wrapper once and calls it with the scope's
/// `exports`, a `require` bound to the scope's module, the module record
/// and the fixed globals. Module code reassigns `module.exports` through
/// [`ModuleScope::set_exports`].
pub trait ScriptEngine: Send + Sync {
    /// Evaluate a wrapped CommonJS module
    fn run_wrapped(&self, source: &WrappedSource, scope: &mut ModuleScope<'_>) -> Result<()>;

    /// Synchronously import an ES module and return its namespace object.
    ///
    /// `source` is the already-read text when the caller has it.
    fn import_module(&self, url: &Url, source: Option<&str>) -> Result<Value> {
        let _ = source;
        let path = url.to_file_path().unwrap_or_else(|_| PathBuf::from(url.as_str()));
        Err(LoaderError::RequireEsm(path))
    }
}

/// Default engine: refuses to evaluate anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScriptEngine;

impl ScriptEngine for NoScriptEngine {
    fn run_wrapped(&self, source: &WrappedSource, _scope: &mut ModuleScope<'_>) -> Result<()> {
        Err(LoaderError::NoScriptEngine(source.filename.clone()))
    }
}

/// Loader for `.node` binaries
pub trait NativeAddonLoader: Send + Sync {
    /// Open the addon and return its exports
    fn open(&self, path: &Path) -> Result<Value>;
}

/// Default addon loader: native addons are disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNativeAddons;

impl NativeAddonLoader for NoNativeAddons {
    fn open(&self, path: &Path) -> Result<Value> {
        Err(LoaderError::NativeAddonsDisabled(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_binds_params_in_order() {
        let src = WrappedSource::new(
            Path::new("/app/a.js"),
            Path::new("/app"),
            "module.exports = 1;".to_string(),
        );
        assert!(src.wrapped.starts_with(
            "(function (exports, require, module, __filename, __dirname, Buffer,"
        ));
        assert!(src.wrapped.contains("module.exports = 1;"));
        assert!(src.wrapped.ends_with("\n})"));
    }

    #[test]
    fn test_default_import_is_unsupported() {
        let url = Url::parse("file:///app/m.mjs").unwrap();
        let err = NoScriptEngine.import_module(&url, None).unwrap_err();
        assert_eq!(err.code(), "ERR_REQUIRE_ESM");
    }

    #[test]
    fn test_native_addons_disabled() {
        let err = NoNativeAddons.open(Path::new("/app/x.node")).unwrap_err();
        assert_eq!(err.code(), "ERR_DLOPEN_DISABLED");
    }
}
