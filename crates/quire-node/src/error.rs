// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for module resolution and loading

use crate::value::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for module system operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors that can occur while resolving or loading a module
#[derive(Debug, Error)]
pub enum LoaderError {
    /// No candidate file matched the request
    #[error("Cannot find module '{specifier}'{}", format_require_stack(.require_stack))]
    ModuleNotFound {
        /// The request as written by the caller
        specifier: String,
        /// Requesting modules, innermost first
        require_stack: Vec<String>,
    },

    /// A package's "main" field points nowhere and it has no index file
    #[error(
        "Cannot find module '{}'. Please verify that the package.json has a valid \"main\" entry",
        .main.display()
    )]
    InvalidPackageMain {
        /// The resolved "main" target
        main: PathBuf,
        /// Directory holding the package.json
        package_dir: PathBuf,
    },

    /// An argument had the wrong type (e.g. a non-string specifier)
    #[error("The \"{name}\" argument must be of type string. Received {received}")]
    InvalidArgType {
        /// Argument name
        name: &'static str,
        /// Description of the received value
        received: String,
    },

    /// An argument had an unacceptable value (e.g. an empty specifier)
    #[error("The argument '{name}' {reason}. Received '{value}'")]
    InvalidArgValue {
        /// Argument name
        name: &'static str,
        /// The offending value
        value: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// `node:` request for a built-in the host did not register
    #[error("No such built-in module: {0}")]
    UnknownBuiltin(String),

    /// Syntax error reported by the script engine
    #[error("{filename}: SyntaxError: {message}")]
    Syntax {
        /// File being compiled
        filename: String,
        /// Engine message
        message: String,
    },

    /// Malformed data module
    #[error("{filename}: {message}")]
    Parse {
        /// File being parsed
        filename: String,
        /// Parser message
        message: String,
    },

    /// Subpath not exposed by a package's "exports"
    #[error("{}", not_exported_message(.subpath, .package_json, .base.as_deref()))]
    PackagePathNotExported {
        /// The subpath (`.` or `./x`)
        subpath: String,
        /// The package.json declaring the export map
        package_json: PathBuf,
        /// The requesting file, if any
        base: Option<PathBuf>,
    },

    /// `#name` request not declared in the package's "imports"
    #[error(
        "Package import specifier \"{specifier}\" is not defined{} imported from {}",
        .package_json.as_ref().map(|p| format!(" in package {}", p.display())).unwrap_or_default(),
        .base.display()
    )]
    PackageImportNotDefined {
        /// The `#` request
        specifier: String,
        /// Nearest package.json, if one exists
        package_json: Option<PathBuf>,
        /// The requesting file
        base: PathBuf,
    },

    /// An export/import map target is malformed or escapes its package
    #[error("Invalid \"{kind}\" target {target} defined for '{key}' in the package config {}", .package_json.display())]
    InvalidPackageTarget {
        /// "exports" or "imports"
        kind: &'static str,
        /// The map key that selected the target
        key: String,
        /// The target as written
        target: String,
        /// Package config declaring the target
        package_json: PathBuf,
    },

    /// A request or pattern substitution contains forbidden segments
    #[error("Invalid module \"{request}\" {reason}")]
    InvalidModuleSpecifier {
        /// The request
        request: String,
        /// Why it was rejected
        reason: String,
    },

    /// A package.json could not be parsed or is inconsistent
    #[error("Invalid package config {}. {message}", .path.display())]
    InvalidPackageConfig {
        /// Path of the package.json
        path: PathBuf,
        /// Parser or validation message
        message: String,
    },

    /// The module is ESM-only and the host has no synchronous importer
    #[error("require() of ES Module {} is not supported by this host", .0.display())]
    RequireEsm(PathBuf),

    /// No script engine is configured for plain-source modules
    #[error("Cannot compile {}: no script engine is configured", .0.display())]
    NoScriptEngine(PathBuf),

    /// Native addons are disabled for this host
    #[error("Cannot load native addon {}: native addons are not supported", .0.display())]
    NativeAddonsDisabled(PathBuf),

    /// A known-incompatible native addon was requested
    #[error("Using {0} module is currently not supported")]
    UnsupportedAddon(&'static str),

    /// A value thrown by module code, propagated unchanged
    #[error("Uncaught {0}")]
    Thrown(Value),

    /// File system error while reading a module
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// Path being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LoaderError {
    /// Create a module not found error without a require stack
    pub fn module_not_found(specifier: impl Into<String>) -> Self {
        Self::ModuleNotFound {
            specifier: specifier.into(),
            require_stack: Vec::new(),
        }
    }

    /// Create a syntax error for `filename`
    pub fn syntax(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Syntax {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Wrap a thrown script value
    pub fn thrown(value: impl Into<Value>) -> Self {
        Self::Thrown(value.into())
    }

    /// Node.js-style error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::ModuleNotFound { .. } | Self::InvalidPackageMain { .. } => "MODULE_NOT_FOUND",
            Self::InvalidArgType { .. } => "ERR_INVALID_ARG_TYPE",
            Self::InvalidArgValue { .. } => "ERR_INVALID_ARG_VALUE",
            Self::UnknownBuiltin(_) => "ERR_UNKNOWN_BUILTIN_MODULE",
            Self::Syntax { .. } => "ERR_SYNTAX",
            Self::Parse { .. } => "ERR_INVALID_JSON",
            Self::PackagePathNotExported { .. } => "ERR_PACKAGE_PATH_NOT_EXPORTED",
            Self::PackageImportNotDefined { .. } => "ERR_PACKAGE_IMPORT_NOT_DEFINED",
            Self::InvalidPackageTarget { .. } => "ERR_INVALID_PACKAGE_TARGET",
            Self::InvalidModuleSpecifier { .. } => "ERR_INVALID_MODULE_SPECIFIER",
            Self::InvalidPackageConfig { .. } => "ERR_INVALID_PACKAGE_CONFIG",
            Self::RequireEsm(_) => "ERR_REQUIRE_ESM",
            Self::NoScriptEngine(_) => "ERR_NO_SCRIPT_ENGINE",
            Self::NativeAddonsDisabled(_) => "ERR_DLOPEN_DISABLED",
            Self::UnsupportedAddon(_) => "ERR_DLOPEN_FAILED",
            Self::Thrown(_) => "ERR_UNCAUGHT",
            Self::Io { .. } => "ERR_FS",
            Self::Config(_) => "ERR_CONFIG",
        }
    }

    /// Whether this is one of the "module not found" errors
    pub fn is_not_found(&self) -> bool {
        self.code() == "MODULE_NOT_FOUND"
    }

    /// Whether this error rejects the caller's argument
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgType { .. } | Self::InvalidArgValue { .. })
    }

    /// Whether this syntax error means the source is an ES module.
    pub fn is_esm_syntax_error(&self) -> bool {
        const ESM_SYNTAX_MESSAGES: &[&str] = &[
            "Cannot use import statement outside a module",
            "Unexpected token 'export'",
            "Cannot use 'import.meta' outside a module",
        ];
        match self {
            Self::Syntax { message, .. } => {
                ESM_SYNTAX_MESSAGES.iter().any(|m| message.contains(m))
            }
            _ => false,
        }
    }
}

fn format_require_stack(stack: &[String]) -> String {
    if stack.is_empty() {
        String::new()
    } else {
        format!("\nRequire stack:\n- {}", stack.join("\n- "))
    }
}

fn not_exported_message(
    subpath: &str,
    package_json: &std::path::Path,
    base: Option<&std::path::Path>,
) -> String {
    let from = base
        .map(|b| format!(" imported from {}", b.display()))
        .unwrap_or_default();
    if subpath == "." {
        format!("No \"exports\" main defined in {}{}", package_json.display(), from)
    } else {
        format!(
            "Package subpath '{}' is not defined by \"exports\" in {}{}",
            subpath,
            package_json.display(),
            from
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_not_found_message_includes_stack() {
        let err = LoaderError::ModuleNotFound {
            specifier: "./missing".to_string(),
            require_stack: vec!["/app/a.js".to_string(), "/app/index.js".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Cannot find module './missing'\nRequire stack:\n- /app/a.js\n- /app/index.js"
        );
        assert_eq!(err.code(), "MODULE_NOT_FOUND");
    }

    #[test]
    fn test_module_not_found_without_stack() {
        let err = LoaderError::module_not_found("lodash");
        assert_eq!(err.to_string(), "Cannot find module 'lodash'");
    }

    #[test]
    fn test_esm_syntax_detection() {
        let err = LoaderError::syntax("/a.js", "Cannot use import statement outside a module");
        assert!(err.is_esm_syntax_error());
        let err = LoaderError::syntax("/a.js", "Unexpected token ')'");
        assert!(!err.is_esm_syntax_error());
    }

    #[test]
    fn test_not_exported_messages() {
        let err = LoaderError::PackagePathNotExported {
            subpath: ".".to_string(),
            package_json: PathBuf::from("/nm/pkg/package.json"),
            base: None,
        };
        assert_eq!(err.to_string(), "No \"exports\" main defined in /nm/pkg/package.json");
        let err = LoaderError::PackagePathNotExported {
            subpath: "./x".to_string(),
            package_json: PathBuf::from("/nm/pkg/package.json"),
            base: Some(PathBuf::from("/app/a.js")),
        };
        assert!(err.to_string().ends_with("imported from /app/a.js"));
    }
}
