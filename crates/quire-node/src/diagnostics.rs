// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Non-fatal warnings raised while resolving and loading modules
//!
//! Warnings never interrupt loading. Each one is logged through `tracing`
//! and kept in a shared buffer so hosts can surface them (the equivalent of
//! `process.emitWarning`).

use parking_lot::Mutex;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Category of a warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// Deprecated package layout, with its deprecation code
    Deprecation {
        /// Deprecation code, e.g. `DEP0128`
        code: &'static str,
    },
    /// Access to a missing export of a module that is still loading
    CircularRequire,
}

/// A single emitted warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Warning category
    pub kind: WarningKind,
    /// Human readable message
    pub message: String,
}

impl Warning {
    /// Invalid "main" field that was rescued by an index file
    pub fn invalid_main(package_json: &Path, main: &str) -> Self {
        Self {
            kind: WarningKind::Deprecation { code: "DEP0128" },
            message: format!(
                "Invalid 'main' field in '{}' of '{}'. Please either fix that or report it to the module author",
                package_json.display(),
                main
            ),
        }
    }

    /// Missing property read on a partially loaded module
    pub fn circular_access(property: &str) -> Self {
        Self {
            kind: WarningKind::CircularRequire,
            message: format!(
                "Accessing non-existent property '{}' of module exports inside circular dependency",
                property
            ),
        }
    }

    /// Warning name as printed by Node.js
    pub fn name(&self) -> &'static str {
        match self.kind {
            WarningKind::Deprecation { .. } => "DeprecationWarning",
            WarningKind::CircularRequire => "Warning",
        }
    }

    /// Deprecation code, if any
    pub fn code(&self) -> Option<&'static str> {
        match self.kind {
            WarningKind::Deprecation { code } => Some(code),
            WarningKind::CircularRequire => None,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(code) => write!(f, "[{}] {}: {}", code, self.name(), self.message),
            None => write!(f, "{}: {}", self.name(), self.message),
        }
    }
}

/// Shared warning sink
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Arc<Mutex<Vec<Warning>>>,
}

impl Diagnostics {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a warning
    pub fn emit(&self, warning: Warning) {
        tracing::warn!(code = warning.code().unwrap_or(""), "{}", warning.message);
        self.warnings.lock().push(warning);
    }

    /// Snapshot of the warnings emitted so far
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().clone()
    }

    /// Drain the buffered warnings
    pub fn take(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.warnings.lock())
    }

    /// Number of buffered warnings
    pub fn len(&self) -> usize {
        self.warnings.lock().len()
    }

    /// Whether no warnings are buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_and_take() {
        let diagnostics = Diagnostics::new();
        let shared = diagnostics.clone();
        shared.emit(Warning::circular_access("foo"));
        assert_eq!(diagnostics.len(), 1);
        let taken = diagnostics.take();
        assert_eq!(taken[0].kind, WarningKind::CircularRequire);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_invalid_main_display() {
        let warning = Warning::invalid_main(Path::new("/nm/b/package.json"), "nope.js");
        assert_eq!(
            warning.to_string(),
            "[DEP0128] DeprecationWarning: Invalid 'main' field in '/nm/b/package.json' of 'nope.js'. Please either fix that or report it to the module author"
        );
    }
}
