// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host collaborators: filesystem, script engine, native addons and the
//! built-in module table.

pub mod builtins;
pub mod engine;
pub mod fs;
pub mod memory;

pub use builtins::{BuiltinModules, NODE_BUILTINS, NODE_SCHEME_ONLY_BUILTINS};
pub use engine::{
    NativeAddonLoader, NoNativeAddons, NoScriptEngine, ScriptEngine, WRAPPER_PARAMS,
    WrappedSource,
};
pub use fs::{FileKind, FileSystem, OsFileSystem};
pub use memory::MemoryFileSystem;
