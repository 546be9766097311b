// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! package.json "exports" and "imports" maps
//!
//! Matching follows the Node.js package resolution rules: exact subpath
//! keys win over `*` patterns, patterns are ranked by the length of the
//! text before their `*`, condition objects are walked in key order and
//! arrays fall back from one entry to the next on invalid targets.

use crate::error::{LoaderError, Result};
use crate::module_system::package::PackageJson;
use crate::module_system::path::normalize;
use serde_json::{Map, Value as Json};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Where a map entry points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageTarget {
    /// A file inside the package
    File(PathBuf),
    /// A bare specifier to resolve from the package directory
    /// (only reachable from "imports")
    Bare(String),
}

/// Result of walking one target value
enum Outcome {
    Resolved(PackageTarget),
    /// The target is explicitly `null`
    Excluded,
    /// No condition matched
    NoMatch,
}

/// Which map a target came from
#[derive(Clone, Copy, PartialEq, Eq)]
enum MapKind {
    Exports,
    Imports,
}

impl MapKind {
    fn name(self) -> &'static str {
        match self {
            MapKind::Exports => "exports",
            MapKind::Imports => "imports",
        }
    }
}

/// Export-map resolution for one set of conditions
pub struct PackageMaps<'a> {
    conditions: &'a [String],
}

impl<'a> PackageMaps<'a> {
    /// Resolver matching `conditions` (plus the implicit "default")
    pub fn new(conditions: &'a [String]) -> Self {
        Self { conditions }
    }

    /// Resolve `subpath` (`.` or `./x`) through the package's "exports"
    pub fn resolve_exports(
        &self,
        package: &PackageJson,
        subpath: &str,
        base: Option<&Path>,
    ) -> Result<PathBuf> {
        let not_exported = || LoaderError::PackagePathNotExported {
            subpath: subpath.to_string(),
            package_json: package.path.clone(),
            base: base.map(Path::to_path_buf),
        };

        let Some(exports) = package.exports.as_ref() else {
            return Err(not_exported());
        };

        let sugar;
        let map = if is_conditional_sugar(exports, &package.path)? {
            sugar = Map::from_iter([(".".to_string(), exports.clone())]);
            &sugar
        } else {
            match exports {
                Json::Object(map) => map,
                _ => return Err(not_exported()),
            }
        };

        let outcome = self.match_map(MapKind::Exports, map, subpath, package)?;
        match outcome {
            Outcome::Resolved(PackageTarget::File(path)) => Ok(path),
            _ => Err(not_exported()),
        }
    }

    /// Resolve a `#name` request through the package's "imports"
    pub fn resolve_imports(
        &self,
        package: &PackageJson,
        name: &str,
        base: &Path,
    ) -> Result<PackageTarget> {
        if name == "#" || name.starts_with("#/") || name.ends_with('/') {
            return Err(LoaderError::InvalidModuleSpecifier {
                request: name.to_string(),
                reason: format!(
                    "is not a valid internal imports specifier name imported from {}",
                    base.display()
                ),
            });
        }

        if let Some(Json::Object(imports)) = package.imports.as_ref() {
            let outcome = self.match_map(MapKind::Imports, imports, name, package)?;
            if let Outcome::Resolved(target) = outcome {
                return Ok(target);
            }
        }

        Err(LoaderError::PackageImportNotDefined {
            specifier: name.to_string(),
            package_json: Some(package.path.clone()),
            base: base.to_path_buf(),
        })
    }

    fn match_map(
        &self,
        kind: MapKind,
        map: &Map<String, Json>,
        request: &str,
        package: &PackageJson,
    ) -> Result<Outcome> {
        if let Some(target) = map.get(request) {
            if !request.contains('*') && !request.ends_with('/') {
                return self.resolve_target(kind, package, target, "", request, false);
            }
        }

        let mut best: Option<(&str, &str)> = None;
        for key in map.keys() {
            let Some(star) = key.find('*') else {
                continue;
            };
            if key.rfind('*') != Some(star) {
                continue;
            }
            let (prefix, trailer) = (&key[..star], &key[star + 1..]);
            if !request.starts_with(prefix)
                || request.len() < key.len()
                || !request.ends_with(trailer)
            {
                continue;
            }
            if best.is_none_or(|(best_key, _)| pattern_key_compare(best_key, key) == Ordering::Greater)
            {
                best = Some((key.as_str(), &request[star..request.len() - trailer.len()]));
            }
        }

        match best {
            Some((key, matched)) => self.resolve_target(kind, package, &map[key], matched, key, true),
            None => Ok(Outcome::NoMatch),
        }
    }

    fn resolve_target(
        &self,
        kind: MapKind,
        package: &PackageJson,
        target: &Json,
        subpath: &str,
        key: &str,
        pattern: bool,
    ) -> Result<Outcome> {
        match target {
            Json::String(target) => self
                .resolve_target_string(kind, package, target, subpath, key, pattern)
                .map(Outcome::Resolved),
            Json::Array(items) if items.is_empty() => Ok(Outcome::Excluded),
            Json::Array(items) => {
                let mut last: Option<Outcome> = None;
                let mut last_error: Option<LoaderError> = None;
                for item in items {
                    match self.resolve_target(kind, package, item, subpath, key, pattern) {
                        Ok(Outcome::Resolved(resolved)) => return Ok(Outcome::Resolved(resolved)),
                        Ok(Outcome::Excluded) => {
                            last_error = None;
                            last = Some(Outcome::Excluded);
                        }
                        Ok(Outcome::NoMatch) => {}
                        Err(e @ LoaderError::InvalidPackageTarget { .. }) => last_error = Some(e),
                        Err(e) => return Err(e),
                    }
                }
                match last_error {
                    Some(e) => Err(e),
                    None => Ok(last.unwrap_or(Outcome::NoMatch)),
                }
            }
            Json::Object(conditions) => {
                if conditions.keys().any(|k| is_array_index(k)) {
                    return Err(LoaderError::InvalidPackageConfig {
                        path: package.path.clone(),
                        message: format!("\"{}\" cannot contain numeric property keys.", kind.name()),
                    });
                }
                for (condition, value) in conditions {
                    if condition != "default" && !self.conditions.iter().any(|c| c == condition) {
                        continue;
                    }
                    match self.resolve_target(kind, package, value, subpath, key, pattern)? {
                        Outcome::NoMatch => continue,
                        outcome => return Ok(outcome),
                    }
                }
                Ok(Outcome::NoMatch)
            }
            Json::Null => Ok(Outcome::Excluded),
            other => Err(invalid_target(kind, key, &other.to_string(), package)),
        }
    }

    fn resolve_target_string(
        &self,
        kind: MapKind,
        package: &PackageJson,
        target: &str,
        subpath: &str,
        key: &str,
        pattern: bool,
    ) -> Result<PackageTarget> {
        let invalid = || invalid_target(kind, key, &format!("\"{}\"", target), package);

        if !subpath.is_empty() && !pattern && !target.ends_with('/') {
            return Err(invalid());
        }

        let Some(relative) = target.strip_prefix("./") else {
            if kind == MapKind::Imports
                && !target.starts_with("../")
                && !target.starts_with('/')
                && !looks_like_url(target)
            {
                let bare = if pattern {
                    target.replace('*', subpath)
                } else {
                    format!("{}{}", target, subpath)
                };
                return Ok(PackageTarget::Bare(bare));
            }
            return Err(invalid());
        };

        if has_invalid_segment(relative, true) {
            return Err(invalid());
        }

        let package_dir = package.dir();
        let resolved = normalize(&package_dir.join(relative));
        if !resolved.starts_with(package_dir) {
            return Err(invalid());
        }

        if subpath.is_empty() {
            return Ok(PackageTarget::File(resolved));
        }

        if has_invalid_segment(subpath, false) {
            let request = if pattern {
                key.replacen('*', subpath, 1)
            } else {
                format!("{}{}", key, subpath)
            };
            return Err(LoaderError::InvalidModuleSpecifier {
                request,
                reason: format!(
                    "request is not a valid match in pattern \"{}\" for the \"{}\" resolution of {}",
                    key,
                    kind.name(),
                    package.path.display()
                ),
            });
        }

        let file = if pattern {
            PathBuf::from(resolved.to_string_lossy().replace('*', subpath))
        } else {
            resolved.join(subpath)
        };
        Ok(PackageTarget::File(file))
    }
}

fn invalid_target(kind: MapKind, key: &str, target: &str, package: &PackageJson) -> LoaderError {
    LoaderError::InvalidPackageTarget {
        kind: kind.name(),
        key: key.to_string(),
        target: target.to_string(),
        package_json: package.path.clone(),
    }
}

/// Whether "exports" is shorthand for `{ ".": exports }`
fn is_conditional_sugar(exports: &Json, package_json: &Path) -> Result<bool> {
    let Json::Object(map) = exports else {
        return Ok(matches!(exports, Json::String(_) | Json::Array(_)));
    };

    let mut sugar = None;
    for key in map.keys() {
        let is_condition = key.is_empty() || !key.starts_with('.');
        match sugar {
            None => sugar = Some(is_condition),
            Some(previous) if previous != is_condition => {
                return Err(LoaderError::InvalidPackageConfig {
                    path: package_json.to_path_buf(),
                    message: "\"exports\" cannot contain some keys starting with '.' and some not. \
                              The exports object must either be an object of package subpath keys \
                              or an object of main entry condition name keys only."
                        .to_string(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(sugar.unwrap_or(false))
}

/// Order of two pattern keys: the one with the longer text before `*`
/// sorts first, then the longer key overall.
pub fn pattern_key_compare(a: &str, b: &str) -> Ordering {
    let a_star = a.find('*');
    let b_star = b.find('*');
    let base_a = a_star.map_or(a.len(), |i| i + 1);
    let base_b = b_star.map_or(b.len(), |i| i + 1);

    if base_a > base_b {
        return Ordering::Less;
    }
    if base_b > base_a {
        return Ordering::Greater;
    }
    if a_star.is_none() {
        return Ordering::Greater;
    }
    if b_star.is_none() {
        return Ordering::Less;
    }
    b.len().cmp(&a.len())
}

fn is_array_index(key: &str) -> bool {
    !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'))
        && key.parse::<u32>().is_ok_and(|n| n < u32::MAX)
}

fn looks_like_url(target: &str) -> bool {
    url::Url::parse(target).is_ok()
}

/// Whether `path` has a `.`, `..` or `node_modules` segment, also when
/// percent-encoded. Empty segments count as invalid unless `allow_empty`.
pub fn has_invalid_segment(path: &str, allow_empty: bool) -> bool {
    path.split(['/', '\\']).any(|segment| {
        if segment.is_empty() {
            return !allow_empty;
        }
        let decoded = percent_decode(&segment.to_ascii_lowercase());
        decoded == "." || decoded == ".." || decoded == "node_modules"
    })
}

/// Decode `%XX` escapes; malformed escapes are kept as written
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            out.push(hex_value(bytes[i + 1]) << 4 | hex_value(bytes[i + 2]));
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(json: &str) -> PackageJson {
        PackageJson::parse(Path::new("/nm/pkg/package.json"), json).unwrap()
    }

    fn conditions() -> Vec<String> {
        vec!["require".to_string(), "node".to_string()]
    }

    fn exports(json: &str, subpath: &str) -> Result<PathBuf> {
        let conditions = conditions();
        PackageMaps::new(&conditions).resolve_exports(&package(json), subpath, None)
    }

    #[test]
    fn test_string_sugar() {
        assert_eq!(
            exports(r#"{"exports":"./main.js"}"#, ".").unwrap(),
            PathBuf::from("/nm/pkg/main.js")
        );
        assert_eq!(exports(r#"{"exports":"./main.js"}"#, "./x").unwrap_err().code(), "ERR_PACKAGE_PATH_NOT_EXPORTED");
    }

    #[test]
    fn test_conditions_in_key_order() {
        let json = r#"{"exports":{"import":"./m.mjs","require":"./c.js","default":"./d.js"}}"#;
        assert_eq!(exports(json, ".").unwrap(), PathBuf::from("/nm/pkg/c.js"));
        let json = r#"{"exports":{".":{"browser":"./b.js","default":"./d.js"}}}"#;
        assert_eq!(exports(json, ".").unwrap(), PathBuf::from("/nm/pkg/d.js"));
    }

    #[test]
    fn test_subpath_patterns() {
        let json = r#"{"exports":{
            "./features/*.js":"./src/features/*.js",
            "./features/internal/*":null,
            "./utils/*":"./lib/utils/*.js"
        }}"#;
        assert_eq!(
            exports(json, "./features/a/b.js").unwrap(),
            PathBuf::from("/nm/pkg/src/features/a/b.js")
        );
        assert_eq!(
            exports(json, "./utils/fmt").unwrap(),
            PathBuf::from("/nm/pkg/lib/utils/fmt.js")
        );
        assert_eq!(
            exports(json, "./features/internal/x").unwrap_err().code(),
            "ERR_PACKAGE_PATH_NOT_EXPORTED"
        );
    }

    #[test]
    fn test_exact_key_beats_pattern() {
        let json = r#"{"exports":{"./a/*":"./wild/*.js","./a/b":"./exact.js"}}"#;
        assert_eq!(exports(json, "./a/b").unwrap(), PathBuf::from("/nm/pkg/exact.js"));
    }

    #[test]
    fn test_fallback_array() {
        let json = r#"{"exports":{".":[{"worker":"./w.js"},"./fallback.js"]}}"#;
        assert_eq!(exports(json, ".").unwrap(), PathBuf::from("/nm/pkg/fallback.js"));
        let json = r#"{"exports":{".":["../escape.js","./ok.js"]}}"#;
        assert_eq!(exports(json, ".").unwrap(), PathBuf::from("/nm/pkg/ok.js"));
    }

    #[test]
    fn test_invalid_targets() {
        for target in ["../up.js", "./node_modules/x.js", "main.js", "./a/%2e%2e/b.js"] {
            let json = format!(r#"{{"exports":{{".":"{}"}}}}"#, target);
            assert_eq!(exports(&json, ".").unwrap_err().code(), "ERR_INVALID_PACKAGE_TARGET", "{}", target);
        }
    }

    #[test]
    fn test_pattern_subpath_segments_rejected() {
        let json = r#"{"exports":{"./*":"./*"}}"#;
        assert_eq!(exports(json, "./../secret").unwrap_err().code(), "ERR_INVALID_MODULE_SPECIFIER");
    }

    #[test]
    fn test_mixed_keys_rejected() {
        let json = r#"{"exports":{".":"./a.js","require":"./b.js"}}"#;
        assert_eq!(exports(json, ".").unwrap_err().code(), "ERR_INVALID_PACKAGE_CONFIG");
    }

    #[test]
    fn test_numeric_condition_keys_rejected() {
        let json = r#"{"exports":{".":{"0":"./a.js"}}}"#;
        assert_eq!(exports(json, ".").unwrap_err().code(), "ERR_INVALID_PACKAGE_CONFIG");
    }

    #[test]
    fn test_imports() {
        let pkg = package(r##"{"imports":{"#db":"./src/db.js","#dep":"lodash","#lib/*":"./lib/*.js"}}"##);
        let conditions = conditions();
        let maps = PackageMaps::new(&conditions);
        let base = Path::new("/nm/pkg/index.js");
        assert_eq!(
            maps.resolve_imports(&pkg, "#db", base).unwrap(),
            PackageTarget::File(PathBuf::from("/nm/pkg/src/db.js"))
        );
        assert_eq!(
            maps.resolve_imports(&pkg, "#dep", base).unwrap(),
            PackageTarget::Bare("lodash".to_string())
        );
        assert_eq!(
            maps.resolve_imports(&pkg, "#lib/x", base).unwrap(),
            PackageTarget::File(PathBuf::from("/nm/pkg/lib/x.js"))
        );
        assert_eq!(
            maps.resolve_imports(&pkg, "#nope", base).unwrap_err().code(),
            "ERR_PACKAGE_IMPORT_NOT_DEFINED"
        );
        assert_eq!(
            maps.resolve_imports(&pkg, "#", base).unwrap_err().code(),
            "ERR_INVALID_MODULE_SPECIFIER"
        );
    }

    #[test]
    fn test_pattern_key_compare() {
        assert_eq!(pattern_key_compare("./a/*", "./a/b/*"), Ordering::Greater);
        assert_eq!(pattern_key_compare("./a/b/*", "./a/*"), Ordering::Less);
        assert_eq!(pattern_key_compare("./a/*.js", "./a/*"), Ordering::Less);
    }

    #[test]
    fn test_invalid_segments() {
        assert!(has_invalid_segment("a/../b", true));
        assert!(has_invalid_segment("a/%2E/b", true));
        assert!(has_invalid_segment("Node_Modules/x", true));
        assert!(!has_invalid_segment("a//b", true));
        assert!(has_invalid_segment("a//b", false));
        assert!(!has_invalid_segment("lib/x.js", false));
    }
}
