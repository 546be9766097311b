// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Built-in module table

use crate::error::{LoaderError, Result};
use crate::value::{ObjectKind, ObjectRef, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Standard Node.js built-in module names
pub const NODE_BUILTINS: &[&str] = &[
    "assert",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "https",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "worker_threads",
    "zlib",
];

/// Built-ins that only exist under the `node:` scheme
pub const NODE_SCHEME_ONLY_BUILTINS: &[&str] = &["sea", "sqlite", "test", "test/reporters"];

const SCHEME: &str = "node:";

/// Host-provided built-in modules, consulted before any filesystem access
#[derive(Debug, Clone, Default)]
pub struct BuiltinModules {
    modules: BTreeMap<String, Value>,
    scheme_only: BTreeSet<String>,
}

impl BuiltinModules {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with an empty host object for every standard built-in
    pub fn with_placeholders() -> Self {
        let mut table = Self::new();
        for name in NODE_BUILTINS {
            table.register(*name, ObjectRef::with_kind(ObjectKind::Host));
        }
        for name in NODE_SCHEME_ONLY_BUILTINS {
            table.register_scheme_only(*name, ObjectRef::with_kind(ObjectKind::Host));
        }
        table
    }

    /// Register a built-in reachable as `name` and `node:name`
    pub fn register(&mut self, name: impl Into<String>, exports: impl Into<Value>) {
        let name = name.into();
        self.scheme_only.remove(&name);
        self.modules.insert(name, exports.into());
    }

    /// Register a built-in reachable only as `node:name`
    pub fn register_scheme_only(&mut self, name: impl Into<String>, exports: impl Into<Value>) {
        let name = name.into();
        self.scheme_only.insert(name.clone());
        self.modules.insert(name, exports.into());
    }

    /// Exports of the built-in named by `request` (with or without `node:`)
    pub fn get(&self, request: &str) -> Option<Value> {
        match request.strip_prefix(SCHEME) {
            Some(name) => self.modules.get(name).cloned(),
            None if self.scheme_only.contains(request) => None,
            None => self.modules.get(request).cloned(),
        }
    }

    /// Whether `request` names a registered built-in
    pub fn is_builtin(&self, request: &str) -> bool {
        self.get(request).is_some()
    }

    /// The resolved id for a built-in request.
    ///
    /// `Ok(None)` means the request is not a built-in and should go through
    /// filesystem resolution. A `node:` request for an unknown name is an
    /// error: the scheme never falls through to the filesystem.
    pub fn resolve_builtin(&self, request: &str) -> Result<Option<String>> {
        match request.strip_prefix(SCHEME) {
            Some(name) if self.modules.contains_key(name) => Ok(Some(request.to_string())),
            Some(_) => Err(LoaderError::UnknownBuiltin(request.to_string())),
            None if self.is_builtin(request) => Ok(Some(request.to_string())),
            None => Ok(None),
        }
    }

    /// Registered names, sorted; scheme-only names carry their prefix
    pub fn names(&self) -> Vec<String> {
        self.modules
            .keys()
            .map(|name| {
                if self.scheme_only.contains(name) {
                    format!("{}{}", SCHEME, name)
                } else {
                    name.clone()
                }
            })
            .collect()
    }

    /// Number of registered built-ins
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_and_plain_names() {
        let mut builtins = BuiltinModules::new();
        builtins.register("fs", Value::new_object());
        assert_eq!(builtins.resolve_builtin("fs").unwrap().as_deref(), Some("fs"));
        assert_eq!(builtins.resolve_builtin("node:fs").unwrap().as_deref(), Some("node:fs"));
        assert!(builtins.resolve_builtin("lodash").unwrap().is_none());
        assert!(Value::same(&builtins.get("fs").unwrap(), &builtins.get("node:fs").unwrap()));
    }

    #[test]
    fn test_unknown_scheme_builtin() {
        let builtins = BuiltinModules::new();
        let err = builtins.resolve_builtin("node:nope").unwrap_err();
        assert_eq!(err.code(), "ERR_UNKNOWN_BUILTIN_MODULE");
    }

    #[test]
    fn test_scheme_only() {
        let builtins = BuiltinModules::with_placeholders();
        assert!(builtins.is_builtin("node:test"));
        assert!(!builtins.is_builtin("test"));
        assert!(builtins.resolve_builtin("test").unwrap().is_none());
        assert!(builtins.names().contains(&"node:test".to_string()));
        assert!(builtins.names().contains(&"path".to_string()));
    }
}
