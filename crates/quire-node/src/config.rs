// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader configuration.
//!
//! Settings are layered: built-in defaults, then `$HOME/.quirerc`, then
//! `./.quirerc`, then `QUIRE_*` environment variables, and finally the
//! Node.js variables `NODE_PATH`, `NODE_PRESERVE_SYMLINKS` and
//! `NODE_PRESERVE_SYMLINKS_MAIN`.

use crate::error::{LoaderError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Export-map conditions used for `require()`
pub const REQUIRE_CONDITIONS: &[&str] = &["require", "node", "node-addons"];

const RC_FILE: &str = ".quirerc";

/// Configuration for a module runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Base directory for the entry module and parentless requests
    pub cwd: PathBuf,

    /// Dependencies live in a project-local `node_modules` only
    pub local_modules_dir: bool,

    /// Host-managed dependency cache, searched for bare specifiers
    /// unless `local_modules_dir` is set
    pub dependency_cache_dir: Option<PathBuf>,

    /// Extra lookup directories appended after a module's own search paths
    pub global_paths: Vec<PathBuf>,

    /// Keep symlinked paths as module filenames instead of canonicalizing
    pub preserve_symlinks: bool,

    /// Same as `preserve_symlinks`, for the entry module
    pub preserve_symlinks_main: bool,

    /// Export-map conditions; "default" always matches
    pub conditions: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
            local_modules_dir: false,
            dependency_cache_dir: None,
            global_paths: Vec::new(),
            preserve_symlinks: false,
            preserve_symlinks_main: false,
            conditions: REQUIRE_CONDITIONS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl LoaderConfig {
    /// Configuration rooted at `cwd` with every other setting defaulted
    pub fn with_cwd(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            ..Self::default()
        }
    }

    /// Load configuration from default locations.
    pub fn load() -> Result<Self> {
        let mut config = LoaderConfig::default();
        config.dependency_cache_dir = Some(default_dependency_cache_dir());
        config.global_paths = default_global_paths();

        // Load from user config file
        if let Some(home) = dirs::home_dir() {
            let user_rc = home.join(RC_FILE);
            if user_rc.is_file() {
                config.merge_from_file(&user_rc)?;
            }
        }

        // Load from project config file
        let project_rc = config.cwd.join(RC_FILE);
        if project_rc.is_file() {
            config.merge_from_file(&project_rc)?;
        }

        config.load_from_env();

        Ok(config)
    }

    /// Merge `key=value` lines from a file.
    pub fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.merge_from_str(&content)
    }

    /// Merge `key=value` lines; `#` and `;` start comments.
    pub fn merge_from_str(&mut self, content: &str) -> Result<()> {
        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(LoaderError::Config(format!(
                    "line {}: expected key=value, found '{}'",
                    number + 1,
                    line
                )));
            };
            self.set(key.trim(), value.trim())?;
        }
        Ok(())
    }

    fn load_from_env(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("QUIRE_") {
                let config_key = config_key.to_lowercase().replace('_', "-");
                if let Err(e) = self.set(&config_key, &value) {
                    tracing::warn!("ignoring {}: {}", key, e);
                }
            }
        }

        if let Ok(node_path) = std::env::var("NODE_PATH") {
            let mut paths: Vec<PathBuf> = std::env::split_paths(&node_path)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            paths.append(&mut self.global_paths);
            self.global_paths = paths;
        }
        if std::env::var("NODE_PRESERVE_SYMLINKS").as_deref() == Ok("1") {
            self.preserve_symlinks = true;
        }
        if std::env::var("NODE_PRESERVE_SYMLINKS_MAIN").as_deref() == Ok("1") {
            self.preserve_symlinks_main = true;
        }
    }

    /// Set a configuration value by its kebab-case key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "cwd" => self.cwd = PathBuf::from(value),
            "local-modules-dir" => self.local_modules_dir = parse_bool(key, value)?,
            "dependency-cache-dir" => {
                self.dependency_cache_dir = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
            "global-paths" => {
                self.global_paths = std::env::split_paths(value)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect()
            }
            "preserve-symlinks" => self.preserve_symlinks = parse_bool(key, value)?,
            "preserve-symlinks-main" => self.preserve_symlinks_main = parse_bool(key, value)?,
            "conditions" => {
                self.conditions = value
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect()
            }
            _ => return Err(LoaderError::Config(format!("unknown key '{}'", key))),
        }
        Ok(())
    }

    /// Get a configuration value by its kebab-case key.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "cwd" => Some(self.cwd.display().to_string()),
            "local-modules-dir" => Some(self.local_modules_dir.to_string()),
            "dependency-cache-dir" => self
                .dependency_cache_dir
                .as_ref()
                .map(|p| p.display().to_string()),
            "global-paths" => std::env::join_paths(&self.global_paths)
                .ok()
                .map(|p| p.to_string_lossy().into_owned()),
            "preserve-symlinks" => Some(self.preserve_symlinks.to_string()),
            "preserve-symlinks-main" => Some(self.preserve_symlinks_main.to_string()),
            "conditions" => Some(self.conditions.join(",")),
            _ => None,
        }
    }

    /// Dependency cache searched for bare specifiers, if enabled
    pub fn active_dependency_cache(&self) -> Option<&Path> {
        if self.local_modules_dir {
            None
        } else {
            self.dependency_cache_dir.as_deref()
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(LoaderError::Config(format!(
            "'{}' expects true or false, found '{}'",
            key, value
        ))),
    }
}

/// Get the default dependency cache directory.
fn default_dependency_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quire")
        .join("npm")
}

/// `$HOME/.node_modules` and `$HOME/.node_libraries`
fn default_global_paths() -> Vec<PathBuf> {
    dirs::home_dir()
        .map(|home| vec![home.join(".node_modules"), home.join(".node_libraries")])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::with_cwd("/app");
        assert_eq!(config.cwd, PathBuf::from("/app"));
        assert!(!config.local_modules_dir);
        assert!(config.active_dependency_cache().is_none());
        assert_eq!(config.conditions, vec!["require", "node", "node-addons"]);
    }

    #[test]
    fn test_merge_from_str() {
        let mut config = LoaderConfig::with_cwd("/app");
        config
            .merge_from_str(
                "# comment\n\
                 dependency-cache-dir=/cache/npm\n\
                 ; another comment\n\
                 preserve-symlinks = true\n\
                 conditions=require, custom\n",
            )
            .unwrap();
        assert_eq!(config.active_dependency_cache(), Some(Path::new("/cache/npm")));
        assert!(config.preserve_symlinks);
        assert_eq!(config.get("conditions").as_deref(), Some("require,custom"));
    }

    #[test]
    fn test_local_modules_dir_disables_cache() {
        let mut config = LoaderConfig::with_cwd("/app");
        config.set("dependency-cache-dir", "/cache").unwrap();
        config.set("local-modules-dir", "true").unwrap();
        assert!(config.active_dependency_cache().is_none());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = LoaderConfig::default();
        assert!(config.set("preserve-symlinks", "maybe").is_err());
        assert!(config.set("no-such-key", "1").is_err());
        assert!(config.merge_from_str("just text").is_err());
    }
}
