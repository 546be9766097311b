// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Node.js CommonJS module system
//!
//! ## Resolution
//! - Built-ins, with and without the `node:` scheme
//! - Relative and absolute paths, extension and `index` probing
//! - `node_modules` lookup, package `main`, `exports` and `imports`
//! - Package self-reference
//!
//! ## Loading
//! - One record per canonical filename, cached before its code runs
//! - Compilers per extension (`require.extensions`)
//! - Guarded partial exports for require cycles

mod cache;
mod circular;
mod exports;
mod loader;
mod module;
mod package;
pub mod path;
mod registry;
mod require;
mod resolver;

pub use cache::{PathCache, RelativeResolveCache, StatCache};
pub use circular::{LoadState, PartialExports, view_of};
pub use exports::{PackageMaps, PackageTarget, pattern_key_compare};
pub use loader::{Compiler, CustomCompiler, ExtensionTable};
pub(crate) use loader::compile;
pub use module::{Module, ModuleId};
pub use package::{PackageJson, PackageJsonReader, PackageType};
pub use registry::ModuleRegistry;
pub use require::{ModuleScope, Require};
pub use resolver::{PathResolver, ResolveOptions, Resolved, parse_package_specifier};
