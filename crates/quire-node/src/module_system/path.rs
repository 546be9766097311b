// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Path helpers for request classification and lookup directories

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path (`path.normalize`): drops `.` segments and
/// folds `..` into the preceding segment. Never touches the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(p) => result.push(p.as_os_str()),
            Component::RootDir => result.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    result.pop();
                    depth -= 1;
                } else if !result.has_root() {
                    result.push("..");
                }
            }
            Component::Normal(name) => {
                result.push(name);
                depth += 1;
            }
        }
    }

    if result.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        result
    }
}

/// `path.resolve(base, request)` for an absolute `base`
pub fn resolve(base: &Path, request: &str) -> PathBuf {
    normalize(&base.join(request))
}

/// Whether `request` is relative in the CommonJS sense: `.`, `..`,
/// or starting with `./` or `../`.
pub fn is_relative_request(request: &str) -> bool {
    let bytes = request.as_bytes();
    match bytes {
        [b'.'] => true,
        [b'.', second, ..] => {
            *second == b'.' || *second == b'/' || (cfg!(windows) && *second == b'\\')
        }
        _ => false,
    }
}

/// Whether `request` is an absolute path
pub fn is_absolute_request(request: &str) -> bool {
    Path::new(request).is_absolute() || request.starts_with('/')
}

/// Whether `request` names a directory explicitly (`./dir/`, `.`, `..`),
/// which skips exact-file and extension probing.
pub fn has_trailing_slash(request: &str) -> bool {
    request.ends_with('/')
        || request.ends_with("/.")
        || request.ends_with("/..")
        || request == "."
        || request == ".."
}

/// Every `node_modules` directory from `from` up to the root, deepest first.
///
/// Ancestors that are themselves a `node_modules` directory do not get a
/// nested `node_modules/node_modules` entry.
pub fn node_module_paths(from: &Path) -> Vec<PathBuf> {
    let from = normalize(from);
    let mut paths = Vec::new();

    for dir in from.ancestors() {
        if dir.parent().is_none() {
            break;
        }
        if dir.file_name().is_some_and(|name| name == "node_modules") {
            continue;
        }
        paths.push(dir.join("node_modules"));
    }

    let root = from
        .ancestors()
        .last()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));
    paths.push(root.join("node_modules"));
    paths
}

/// Containing directory of a module filename
pub fn dirname(filename: &Path) -> PathBuf {
    filename
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Append `suffix` to the final path segment (`/a/b` + `.js` → `/a/b.js`)
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/app/./lib/../index.js")), PathBuf::from("/app/index.js"));
        assert_eq!(normalize(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn test_is_relative_request() {
        assert!(is_relative_request("./lib"));
        assert!(is_relative_request("../lib"));
        assert!(is_relative_request("."));
        assert!(is_relative_request(".."));
        assert!(!is_relative_request(".hidden"));
        assert!(!is_relative_request("lodash"));
        assert!(!is_relative_request("/abs"));
    }

    #[test]
    fn test_trailing_slash() {
        assert!(has_trailing_slash("./dir/"));
        assert!(has_trailing_slash("."));
        assert!(has_trailing_slash("../.."));
        assert!(!has_trailing_slash("./dir"));
    }

    #[test]
    fn test_node_module_paths() {
        assert_eq!(
            node_module_paths(Path::new("/app/src")),
            vec![
                PathBuf::from("/app/src/node_modules"),
                PathBuf::from("/app/node_modules"),
                PathBuf::from("/node_modules"),
            ]
        );
    }

    #[test]
    fn test_node_module_paths_skips_nested_node_modules() {
        assert_eq!(
            node_module_paths(Path::new("/app/node_modules/pkg")),
            vec![
                PathBuf::from("/app/node_modules/pkg/node_modules"),
                PathBuf::from("/app/node_modules"),
                PathBuf::from("/node_modules"),
            ]
        );
        assert_eq!(node_module_paths(Path::new("/")), vec![PathBuf::from("/node_modules")]);
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix(Path::new("/a/b.min"), ".js"), PathBuf::from("/a/b.min.js"));
    }
}
