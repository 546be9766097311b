// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # quire-node
//!
//! A synchronous, Node.js-compatible CommonJS module system.
//!
//! The crate resolves `require()` requests the way Node.js does and keeps
//! one record per canonical filename:
//!
//! - Relative, absolute and bare requests, with extension and `index`
//!   probing
//! - `node_modules` lookup, `main`, `exports` and `imports` maps and
//!   package self-reference
//! - `node:` built-ins supplied by the host
//! - JSON modules, `.cjs`/`.mjs` handling and custom compilers
//! - Require cycles with guarded partial exports
//!
//! Evaluating JavaScript is left to a host [`ScriptEngine`]; the default
//! engine refuses to run scripts, so JSON modules and built-ins work out
//! of the box.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quire_node::{LoaderConfig, ModuleRuntime};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut runtime = ModuleRuntime::new(LoaderConfig::load()?);
//!     let package = runtime.require("./package.json")?;
//!     println!("{}", package.get("name"));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod module_system;
pub mod runtime;
pub mod value;

// Re-exports
pub use config::LoaderConfig;
pub use diagnostics::{Diagnostics, Warning, WarningKind};
pub use error::{LoaderError, Result};
pub use host::{
    BuiltinModules, FileKind, FileSystem, MemoryFileSystem, NativeAddonLoader, OsFileSystem,
    ScriptEngine, WrappedSource,
};
pub use module_system::{
    Compiler, CustomCompiler, ExtensionTable, Module, ModuleId, ModuleScope, PartialExports,
    Require, ResolveOptions, Resolved,
};
pub use runtime::{ModuleRuntime, ModuleRuntimeBuilder};
pub use value::{ArrayRef, NativeFunction, ObjectKind, ObjectRef, Value};

/// Version of the quire-node crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Node.js release whose module semantics are followed
pub const NODE_API_VERSION: &str = "20.0.0";
