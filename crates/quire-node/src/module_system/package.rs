// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! package.json reading for resolution

use crate::error::{LoaderError, Result};
use crate::host::{FileKind, FileSystem};
use dashmap::DashMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Module format declared by a package's "type" field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageType {
    /// `"type": "commonjs"`
    CommonJs,
    /// `"type": "module"`
    Module,
}

/// The fields of a package.json that resolution cares about
#[derive(Debug, Clone)]
pub struct PackageJson {
    /// Path of the package.json file itself
    pub path: PathBuf,
    /// "name", if it is a string
    pub name: Option<String>,
    /// "main", if it is a non-empty string
    pub main: Option<String>,
    /// "type", if it is one of the two recognized values
    pub package_type: Option<PackageType>,
    /// "exports", unless absent or null
    pub exports: Option<serde_json::Value>,
    /// "imports", unless absent or null
    pub imports: Option<serde_json::Value>,
}

impl PackageJson {
    /// Parse package.json text located at `path`
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let raw: RawPackageJson =
            serde_json::from_str(strip_bom(text)).map_err(|e| LoaderError::InvalidPackageConfig {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let string_field = |value: Option<serde_json::Value>| match value {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        };
        let package_type = match raw.package_type {
            Some(serde_json::Value::String(t)) if t == "module" => Some(PackageType::Module),
            Some(serde_json::Value::String(t)) if t == "commonjs" => Some(PackageType::CommonJs),
            _ => None,
        };

        Ok(Self {
            path: path.to_path_buf(),
            name: string_field(raw.name),
            main: string_field(raw.main),
            package_type,
            exports: raw.exports.filter(|v| !v.is_null()),
            imports: raw.imports.filter(|v| !v.is_null()),
        })
    }

    /// Directory containing the package.json
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("/"))
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawPackageJson {
    name: Option<serde_json::Value>,
    main: Option<serde_json::Value>,
    #[serde(rename = "type")]
    package_type: Option<serde_json::Value>,
    exports: Option<serde_json::Value>,
    imports: Option<serde_json::Value>,
}

/// Strip a leading UTF-8 byte order mark
pub(crate) fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Reads package.json files, caching by directory (including misses)
pub struct PackageJsonReader {
    fs: Arc<dyn FileSystem>,
    cache: DashMap<PathBuf, Option<Arc<PackageJson>>>,
}

impl PackageJsonReader {
    /// Create a reader over `fs`
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            cache: DashMap::new(),
        }
    }

    /// The package.json directly inside `dir`, if any
    pub fn read(&self, dir: &Path) -> Result<Option<Arc<PackageJson>>> {
        if let Some(cached) = self.cache.get(dir) {
            return Ok(cached.clone());
        }

        let path = dir.join("package.json");
        let package = if self.fs.stat(&path) == Some(FileKind::File) {
            let text = self
                .fs
                .read_to_string(&path)
                .map_err(|source| LoaderError::Io {
                    path: path.clone(),
                    source,
                })?;
            Some(Arc::new(PackageJson::parse(&path, &text)?))
        } else {
            None
        };

        tracing::trace!(dir = %dir.display(), found = package.is_some(), "read package.json");
        self.cache.insert(dir.to_path_buf(), package.clone());
        Ok(package)
    }

    /// The nearest package.json enclosing `file`.
    ///
    /// The walk stops at a `node_modules` directory so that a dependency
    /// never inherits the scope of the package that installed it.
    pub fn read_package_scope(&self, file: &Path) -> Result<Option<Arc<PackageJson>>> {
        for dir in file.ancestors().skip(1) {
            if dir.file_name().is_some_and(|name| name == "node_modules") {
                return Ok(None);
            }
            if let Some(package) = self.read(dir)? {
                return Ok(Some(package));
            }
        }
        Ok(None)
    }

    /// Number of cached directories
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether nothing has been read yet
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl std::fmt::Debug for PackageJsonReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageJsonReader")
            .field("cached", &self.cache.len())
            .finish()
    }
}
