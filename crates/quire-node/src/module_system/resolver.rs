// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution (Node.js algorithm)

use crate::config::LoaderConfig;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{LoaderError, Result};
use crate::host::{BuiltinModules, FileKind, FileSystem};
use crate::module_system::cache::{PathCache, StatCache};
use crate::module_system::exports::{PackageMaps, PackageTarget, percent_decode};
use crate::module_system::loader::ExtensionTable;
use crate::module_system::module::{Module, ModuleId};
use crate::module_system::package::{PackageJson, PackageJsonReader};
use crate::module_system::path::{
    has_trailing_slash, is_absolute_request, is_relative_request, node_module_paths, normalize,
    resolve, with_suffix,
};
use crate::module_system::registry::ModuleRegistry;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of module resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Built-in module, as requested (`fs` or `node:fs`)
    Builtin(String),
    /// Canonical filename
    File(PathBuf),
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Builtin(name) => write!(f, "{}", name),
            Resolved::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Options of `require.resolve`
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Directories to search instead of the requester's own lookup paths
    pub paths: Option<Vec<PathBuf>>,
}

impl ResolveOptions {
    /// Options searching `paths`
    pub fn with_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: Some(paths.into_iter().map(Into::into).collect()),
        }
    }
}

/// Module resolver implementing the Node.js resolution algorithm
pub struct PathResolver {
    fs: Arc<dyn FileSystem>,
    packages: PackageJsonReader,
    path_cache: PathCache,
    stat_cache: Arc<StatCache>,
    builtins: BuiltinModules,
    config: LoaderConfig,
    diagnostics: Diagnostics,
}

impl PathResolver {
    /// Create a resolver
    pub fn new(
        fs: Arc<dyn FileSystem>,
        builtins: BuiltinModules,
        config: LoaderConfig,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            packages: PackageJsonReader::new(Arc::clone(&fs)),
            fs,
            path_cache: PathCache::new(),
            stat_cache: Arc::new(StatCache::new()),
            builtins,
            config,
            diagnostics,
        }
    }

    /// Loader configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Built-in module table
    pub fn builtins(&self) -> &BuiltinModules {
        &self.builtins
    }

    /// package.json reader shared with the loader
    pub fn packages(&self) -> &PackageJsonReader {
        &self.packages
    }

    /// Memoized lookups
    pub fn path_cache(&self) -> &PathCache {
        &self.path_cache
    }

    /// The per-require stat cache
    pub fn stat_cache(&self) -> &Arc<StatCache> {
        &self.stat_cache
    }

    fn stat(&self, path: &Path) -> Option<FileKind> {
        self.stat_cache.stat(self.fs.as_ref(), path)
    }

    /// Candidate directories for `request` issued by `parent`
    /// (`require.resolve.paths`). `None` for built-ins.
    pub fn lookup_paths(&self, request: &str, parent: Option<&Module>) -> Option<Vec<PathBuf>> {
        if self.builtins.is_builtin(request) {
            return None;
        }

        if !is_relative_request(request) {
            let mut paths = match parent {
                Some(module) => module.paths().to_vec(),
                None => node_module_paths(&self.config.cwd),
            };
            self.append_global_paths(&mut paths);
            return Some(paths);
        }

        let dir = parent.map_or_else(|| self.config.cwd.clone(), |m| m.directory().to_path_buf());
        Some(vec![dir])
    }

    fn append_global_paths(&self, paths: &mut Vec<PathBuf>) {
        if let Some(cache) = self.config.active_dependency_cache() {
            paths.push(cache.to_path_buf());
        }
        paths.extend(self.config.global_paths.iter().cloned());
    }

    /// Lookup directories from `require.resolve(request, { paths })`
    fn paths_from_option(&self, request: &str, dirs: &[PathBuf]) -> Vec<PathBuf> {
        let dirs = dirs.iter().map(|dir| normalize(&self.config.cwd.join(dir)));
        if is_relative_request(request) {
            return dirs.collect();
        }

        let mut paths = Vec::new();
        for dir in dirs {
            let mut lookup = node_module_paths(&dir);
            self.append_global_paths(&mut lookup);
            for path in lookup {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        paths
    }

    /// Resolve `request` as issued by `parent` to a built-in id or a
    /// canonical filename.
    pub fn resolve_filename(
        &self,
        registry: &ModuleRegistry,
        extensions: &ExtensionTable,
        request: &str,
        parent: Option<ModuleId>,
        is_main: bool,
        options: Option<&ResolveOptions>,
    ) -> Result<Resolved> {
        if let Some(id) = self.builtins.resolve_builtin(request)? {
            return Ok(Resolved::Builtin(id));
        }

        let parent_module = parent.and_then(|id| registry.get(id));
        let custom_paths = options.and_then(|o| o.paths.as_deref());
        let paths = match custom_paths {
            Some(dirs) => self.paths_from_option(request, dirs),
            None => self.lookup_paths(request, parent_module).unwrap_or_default(),
        };
        let base = parent_module.map_or_else(
            || self.config.cwd.join("[eval]"),
            |m| m.filename().to_path_buf(),
        );

        if request.starts_with('#') {
            if let Some(package) = self.packages.read_package_scope(&base)? {
                if package.imports.is_some() {
                    return self.resolve_imports(extensions, &package, request, &base);
                }
            }
        }

        if let Some(filename) = self.try_self(&base, request)? {
            self.path_cache
                .set(self.cache_key(request, &paths, is_main), filename.clone());
            return Ok(Resolved::File(filename));
        }

        let found = self.find_path(extensions, request, &paths, is_main);
        if let Ok(Some(filename)) = found {
            return Ok(Resolved::File(filename));
        }

        // A bare request that misses the custom paths, or fails in them,
        // gets one more try with the requester's default lookup paths.
        if custom_paths.is_some() && is_bare_request(request) {
            if let Ok(resolved) =
                self.resolve_filename(registry, extensions, request, parent, is_main, None)
            {
                return Ok(resolved);
            }
        }

        if let Err(e) = found {
            return Err(e);
        }
        Err(LoaderError::ModuleNotFound {
            specifier: request.to_string(),
            require_stack: registry.require_stack(parent),
        })
    }

    /// Path cache key; entry-module lookups get their own entries when
    /// they follow a different symlink policy.
    fn cache_key(&self, request: &str, paths: &[PathBuf], is_main: bool) -> String {
        let mut key = PathCache::key(request, paths);
        if is_main && self.config.preserve_symlinks_main != self.config.preserve_symlinks {
            key.push_str("\0[main]");
        }
        key
    }

    /// Search `paths` for `request`; absolute requests ignore `paths`.
    pub fn find_path(
        &self,
        extensions: &ExtensionTable,
        request: &str,
        paths: &[PathBuf],
        is_main: bool,
    ) -> Result<Option<PathBuf>> {
        let absolute = is_absolute_request(request);
        let root = [PathBuf::new()];
        let paths: &[PathBuf] = if absolute {
            &root
        } else if paths.is_empty() {
            return Ok(None);
        } else {
            paths
        };

        let cache_key = self.cache_key(request, paths, is_main);
        if let Some(filename) = self.path_cache.get(&cache_key) {
            tracing::trace!(request, filename = %filename.display(), "path cache hit");
            return Ok(Some(filename));
        }

        let trailing_slash = has_trailing_slash(request);
        let inside_path =
            !(is_relative_request(request) && normalize(Path::new(request)).starts_with(".."));

        for dir in paths {
            if inside_path
                && !dir.as_os_str().is_empty()
                && self.stat(dir) != Some(FileKind::Directory)
            {
                continue;
            }

            if !absolute {
                if let Some(filename) = self.resolve_exports(dir, request)? {
                    self.path_cache.set(cache_key, filename.clone());
                    return Ok(Some(filename));
                }
            }

            let base_path = resolve(dir, request);
            let kind = self.stat(&base_path);
            tracing::trace!(request, candidate = %base_path.display(), ?kind, "probing");

            let mut filename = None;
            if !trailing_slash {
                if kind == Some(FileKind::File) {
                    filename = Some(self.to_real_path(&base_path, is_main)?);
                }
                if filename.is_none() {
                    filename = self.try_extensions(&base_path, extensions, is_main)?;
                }
            }
            if filename.is_none() && kind == Some(FileKind::Directory) {
                filename = self.try_package(&base_path, extensions, is_main)?;
            }

            if let Some(filename) = filename {
                tracing::debug!(request, filename = %filename.display(), "resolved");
                self.path_cache.set(cache_key, filename.clone());
                return Ok(Some(filename));
            }
        }

        Ok(None)
    }

    fn to_real_path(&self, path: &Path, is_main: bool) -> Result<PathBuf> {
        let preserve = if is_main {
            self.config.preserve_symlinks_main
        } else {
            self.config.preserve_symlinks
        };
        if preserve {
            return Ok(normalize(path));
        }
        self.fs.realpath(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn try_file(&self, path: &Path, is_main: bool) -> Result<Option<PathBuf>> {
        if self.stat(path) != Some(FileKind::File) {
            return Ok(None);
        }
        self.to_real_path(path, is_main).map(Some)
    }

    fn try_extensions(
        &self,
        base: &Path,
        extensions: &ExtensionTable,
        is_main: bool,
    ) -> Result<Option<PathBuf>> {
        for ext in extensions.names() {
            if let Some(filename) = self.try_file(&with_suffix(base, ext), is_main)? {
                return Ok(Some(filename));
            }
        }
        Ok(None)
    }

    /// Resolve a directory through its package.json "main", then `index`
    fn try_package(
        &self,
        dir: &Path,
        extensions: &ExtensionTable,
        is_main: bool,
    ) -> Result<Option<PathBuf>> {
        let package = self.packages.read(dir)?;
        let index = dir.join("index");
        let Some((package, main)) = package.as_ref().and_then(|p| p.main.as_deref().map(|m| (p, m)))
        else {
            return self.try_extensions(&index, extensions, is_main);
        };

        let target = resolve(dir, main);
        let found = match self.try_file(&target, is_main)? {
            Some(filename) => Some(filename),
            None => match self.try_extensions(&target, extensions, is_main)? {
                Some(filename) => Some(filename),
                None => self.try_extensions(&target.join("index"), extensions, is_main)?,
            },
        };
        if found.is_some() {
            return Ok(found);
        }

        match self.try_extensions(&index, extensions, is_main)? {
            Some(filename) => {
                self.diagnostics.emit(Warning::invalid_main(&package.path, main));
                Ok(Some(filename))
            }
            None => Err(LoaderError::InvalidPackageMain {
                main: target,
                package_dir: dir.to_path_buf(),
            }),
        }
    }

    /// Match `request` against the "exports" of the package it names
    /// inside the `node_modules` directory `dir`.
    fn resolve_exports(&self, dir: &Path, request: &str) -> Result<Option<PathBuf>> {
        let Some((name, expansion)) = parse_package_specifier(request) else {
            return Ok(None);
        };
        let Some(package) = self.packages.read(&dir.join(name))? else {
            return Ok(None);
        };
        if package.exports.is_none() {
            return Ok(None);
        }

        let subpath = format!(".{}", expansion);
        match PackageMaps::new(&self.config.conditions).resolve_exports(&package, &subpath, None) {
            Ok(target) => self.finalize_resolution(&target).map(Some),
            // Unexported subpaths fall through to plain file probing.
            Err(LoaderError::PackagePathNotExported { .. }) => {
                tracing::trace!(request, subpath = %subpath, "not exported, probing files");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// A package requiring itself by name through its own "exports"
    fn try_self(&self, base: &Path, request: &str) -> Result<Option<PathBuf>> {
        let Some(package) = self.packages.read_package_scope(base)? else {
            return Ok(None);
        };
        let Some(name) = package.name.as_deref() else {
            return Ok(None);
        };
        if package.exports.is_none() {
            return Ok(None);
        }

        let expansion = if request == name {
            ".".to_string()
        } else {
            match request.strip_prefix(name) {
                Some(rest) if rest.starts_with('/') => format!(".{}", rest),
                _ => return Ok(None),
            }
        };

        let target = PackageMaps::new(&self.config.conditions).resolve_exports(
            &package,
            &expansion,
            Some(base),
        )?;
        tracing::trace!(request, package = name, "self-reference");
        self.finalize_resolution(&target).map(Some)
    }

    /// Resolve a `#name` request through the nearest package's "imports"
    fn resolve_imports(
        &self,
        extensions: &ExtensionTable,
        package: &PackageJson,
        request: &str,
        base: &Path,
    ) -> Result<Resolved> {
        let target = PackageMaps::new(&self.config.conditions).resolve_imports(package, request, base)?;
        match target {
            PackageTarget::File(path) => self.finalize_resolution(&path).map(Resolved::File),
            PackageTarget::Bare(specifier) => {
                if let Some(id) = self.builtins.resolve_builtin(&specifier)? {
                    return Ok(Resolved::Builtin(id));
                }
                let mut paths = node_module_paths(package.dir());
                self.append_global_paths(&mut paths);
                match self.find_path(extensions, &specifier, &paths, false)? {
                    Some(filename) => Ok(Resolved::File(filename)),
                    None => Err(LoaderError::module_not_found(specifier)),
                }
            }
        }
    }

    /// Map-resolved targets must exist as files; no extension probing
    fn finalize_resolution(&self, target: &Path) -> Result<PathBuf> {
        let text = target.to_string_lossy();
        let lower = text.to_ascii_lowercase();
        if lower.contains("%2f") || lower.contains("%5c") {
            return Err(LoaderError::InvalidModuleSpecifier {
                request: text.into_owned(),
                reason: "must not include encoded \"/\" or \"\\\" characters".to_string(),
            });
        }

        let filename = PathBuf::from(percent_decode(&text));
        match self.try_file(&filename, false)? {
            Some(real) => Ok(real),
            None => Err(LoaderError::module_not_found(filename.display().to_string())),
        }
    }
}

impl fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathResolver")
            .field("config", &self.config)
            .field("cached_paths", &self.path_cache.len())
            .finish()
    }
}

/// Neither relative, absolute, private (`#`) nor a file URL
fn is_bare_request(request: &str) -> bool {
    !request.is_empty()
        && !is_relative_request(request)
        && !is_absolute_request(request)
        && !request.starts_with('#')
        && !request.starts_with("file:///")
}

/// Split a bare request into its package name and the rest
/// (`@scope/pkg/lib/x` → `@scope/pkg`, `/lib/x`).
pub fn parse_package_specifier(specifier: &str) -> Option<(&str, &str)> {
    let forbidden = |c: char| c == '/' || c == '\\' || c == '%';

    let mut name_start = 0;
    if let Some(rest) = specifier.strip_prefix('@') {
        if let Some(slash) = rest.find('/') {
            let scope = &rest[..slash];
            if !scope.is_empty() && !scope.contains(['\\', '%']) {
                name_start = slash + 2;
            }
        }
    }

    let rest = &specifier[name_start..];
    let first = rest.chars().next()?;
    if first == '.' || forbidden(first) {
        return None;
    }
    let name_end = name_start + rest.find(forbidden).unwrap_or(rest.len());
    let (name, expansion) = specifier.split_at(name_end);
    if !expansion.is_empty() && !expansion.starts_with('/') {
        return None;
    }
    Some((name, expansion))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryFileSystem;

    fn resolver(fs: MemoryFileSystem) -> PathResolver {
        PathResolver::new(
            Arc::new(fs),
            BuiltinModules::with_placeholders(),
            LoaderConfig::with_cwd("/app"),
            Diagnostics::new(),
        )
    }

    fn resolve_from_cwd(resolver: &PathResolver, request: &str) -> Result<Resolved> {
        resolver.resolve_filename(
            &ModuleRegistry::new(),
            &ExtensionTable::new(),
            request,
            None,
            false,
            None,
        )
    }

    #[test]
    fn test_parse_package_specifier() {
        assert_eq!(parse_package_specifier("lodash"), Some(("lodash", "")));
        assert_eq!(parse_package_specifier("lodash/get"), Some(("lodash", "/get")));
        assert_eq!(parse_package_specifier("@types/node"), Some(("@types/node", "")));
        assert_eq!(
            parse_package_specifier("@babel/core/lib/index"),
            Some(("@babel/core", "/lib/index"))
        );
        assert_eq!(parse_package_specifier("./local"), None);
        assert_eq!(parse_package_specifier("pkg%2fx"), None);
    }

    #[test]
    fn test_builtins_win() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/app/node_modules/fs/index.js", "");
        let resolver = resolver(fs);
        assert_eq!(resolve_from_cwd(&resolver, "fs").unwrap(), Resolved::Builtin("fs".into()));
        assert_eq!(
            resolve_from_cwd(&resolver, "node:fs").unwrap(),
            Resolved::Builtin("node:fs".into())
        );
    }

    #[test]
    fn test_extension_order() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/app/lib.json", "{}");
        fs.add_file("/app/lib.js", "");
        let resolver = resolver(fs);
        assert_eq!(
            resolve_from_cwd(&resolver, "./lib").unwrap(),
            Resolved::File(PathBuf::from("/app/lib.js"))
        );
    }

    #[test]
    fn test_exact_file_beats_extension() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/app/lib", "");
        fs.add_file("/app/lib.js", "");
        let resolver = resolver(fs);
        assert_eq!(
            resolve_from_cwd(&resolver, "./lib").unwrap(),
            Resolved::File(PathBuf::from("/app/lib"))
        );
    }

    #[test]
    fn test_trailing_slash_skips_files() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/app/dir.js", "");
        fs.add_file("/app/dir/index.js", "");
        let resolver = resolver(fs);
        assert_eq!(
            resolve_from_cwd(&resolver, "./dir/").unwrap(),
            Resolved::File(PathBuf::from("/app/dir/index.js"))
        );
        assert_eq!(
            resolve_from_cwd(&resolver, "./dir").unwrap(),
            Resolved::File(PathBuf::from("/app/dir.js"))
        );
    }

    #[test]
    fn test_invalid_main_falls_back_to_index() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/app/node_modules/b/package.json", r#"{"main":"missing.js"}"#);
        fs.add_file("/app/node_modules/b/index.js", "");
        let resolver = resolver(fs);
        assert_eq!(
            resolve_from_cwd(&resolver, "b").unwrap(),
            Resolved::File(PathBuf::from("/app/node_modules/b/index.js"))
        );
        let warnings = resolver.diagnostics.take();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code(), Some("DEP0128"));
    }

    #[test]
    fn test_invalid_main_without_index() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/app/node_modules/b/package.json", r#"{"main":"missing.js"}"#);
        let resolver = resolver(fs);
        let err = resolve_from_cwd(&resolver, "b").unwrap_err();
        assert_eq!(err.code(), "MODULE_NOT_FOUND");
        assert!(err.to_string().contains("/app/node_modules/b/missing.js"));
    }

    #[test]
    fn test_main_directory_index() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/app/node_modules/b/package.json", r#"{"main":"lib"}"#);
        fs.add_file("/app/node_modules/b/lib/index.json", "{}");
        let resolver = resolver(fs);
        assert_eq!(
            resolve_from_cwd(&resolver, "b").unwrap(),
            Resolved::File(PathBuf::from("/app/node_modules/b/lib/index.json"))
        );
    }

    #[test]
    fn test_lookup_paths() {
        let mut config = LoaderConfig::with_cwd("/app");
        config.dependency_cache_dir = Some(PathBuf::from("/cache"));
        config.global_paths = vec![PathBuf::from("/global")];
        let resolver = PathResolver::new(
            Arc::new(MemoryFileSystem::new()),
            BuiltinModules::with_placeholders(),
            config,
            Diagnostics::new(),
        );

        assert_eq!(resolver.lookup_paths("fs", None), None);
        assert_eq!(resolver.lookup_paths("./x", None), Some(vec![PathBuf::from("/app")]));
        assert_eq!(
            resolver.lookup_paths("lodash", None),
            Some(vec![
                PathBuf::from("/app/node_modules"),
                PathBuf::from("/node_modules"),
                PathBuf::from("/cache"),
                PathBuf::from("/global"),
            ])
        );
    }

    #[test]
    fn test_local_modules_dir_skips_dependency_cache() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/cache/dep/index.js", "");
        let mut config = LoaderConfig::with_cwd("/app");
        config.dependency_cache_dir = Some(PathBuf::from("/cache"));
        let cached = PathResolver::new(
            Arc::new(fs),
            BuiltinModules::new(),
            config.clone(),
            Diagnostics::new(),
        );
        assert_eq!(
            resolve_from_cwd(&cached, "dep").unwrap(),
            Resolved::File(PathBuf::from("/cache/dep/index.js"))
        );

        let fs = MemoryFileSystem::new();
        fs.add_file("/cache/dep/index.js", "");
        config.local_modules_dir = true;
        let local = PathResolver::new(Arc::new(fs), BuiltinModules::new(), config, Diagnostics::new());
        assert!(resolve_from_cwd(&local, "dep").unwrap_err().is_not_found());
    }

    #[test]
    fn test_symlinks_are_canonicalized() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/store/dep/index.js", "");
        fs.add_symlink("/app/node_modules/dep", "/store/dep");
        let resolver = resolver(fs);
        assert_eq!(
            resolve_from_cwd(&resolver, "dep").unwrap(),
            Resolved::File(PathBuf::from("/store/dep/index.js"))
        );
    }

    #[test]
    fn test_preserve_symlinks() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/store/dep/index.js", "");
        fs.add_symlink("/app/node_modules/dep", "/store/dep");
        let mut config = LoaderConfig::with_cwd("/app");
        config.preserve_symlinks = true;
        let resolver =
            PathResolver::new(Arc::new(fs), BuiltinModules::new(), config, Diagnostics::new());
        assert_eq!(
            resolve_from_cwd(&resolver, "dep").unwrap(),
            Resolved::File(PathBuf::from("/app/node_modules/dep/index.js"))
        );
    }

    #[test]
    fn test_exports_target_must_exist() {
        let fs = MemoryFileSystem::new();
        fs.add_file(
            "/app/node_modules/pkg/package.json",
            r#"{"name":"pkg","exports":{".":"./missing.js"}}"#,
        );
        fs.add_file("/app/node_modules/pkg/index.js", "");
        let resolver = resolver(fs);
        let err = resolve_from_cwd(&resolver, "pkg").unwrap_err();
        assert_eq!(err.to_string(), "Cannot find module '/app/node_modules/pkg/missing.js'");
    }

    #[test]
    fn test_entry_lookup_keeps_its_own_symlink_policy() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/store/dep/index.js", "");
        fs.add_symlink("/app/node_modules/dep", "/store/dep");
        let mut config = LoaderConfig::with_cwd("/app");
        config.preserve_symlinks = true;
        config.preserve_symlinks_main = false;
        let resolver =
            PathResolver::new(Arc::new(fs), BuiltinModules::new(), config, Diagnostics::new());
        let registry = ModuleRegistry::new();
        let extensions = ExtensionTable::new();

        assert_eq!(
            resolve_from_cwd(&resolver, "dep").unwrap(),
            Resolved::File(PathBuf::from("/app/node_modules/dep/index.js"))
        );
        assert_eq!(
            resolver
                .resolve_filename(&registry, &extensions, "dep", None, true, None)
                .unwrap(),
            Resolved::File(PathBuf::from("/store/dep/index.js"))
        );
    }
}
