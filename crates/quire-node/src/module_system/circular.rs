// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Guarded exports for modules that are still loading
//!
//! A require cycle hands out the exports of a module whose code has not
//! finished running. Instead of swapping the object's prototype, the view
//! is a [`PartialExports`] wrapper sharing the exports object and the
//! module's [`LoadState`]. Once the module finishes loading, every view
//! behaves like the plain object.

use crate::diagnostics::{Diagnostics, Warning};
use crate::module_system::module::Module;
use crate::value::{ObjectRef, Value};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared "loaded" flag of a module; never reset once set
#[derive(Debug, Clone, Default)]
pub struct LoadState(Arc<AtomicBool>);

impl LoadState {
    /// A fresh, not yet loaded state
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the module finished loading
    pub fn is_loaded(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark the module as loaded
    pub fn mark_loaded(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Exports of a module observed before it finished loading
#[derive(Clone)]
pub struct PartialExports {
    object: ObjectRef,
    state: LoadState,
    diagnostics: Diagnostics,
}

impl PartialExports {
    /// The underlying exports object
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    /// Whether reads of missing properties still warn
    pub fn is_guarded(&self) -> bool {
        !self.state.is_loaded()
    }

    /// Property read. Missing properties read while the module is loading
    /// emit a warning and yield `undefined`.
    pub fn get(&self, key: &str) -> Value {
        if let Some(value) = self.object.get(key) {
            return value;
        }
        if self.is_guarded() && key != "__esModule" {
            self.diagnostics.emit(Warning::circular_access(key));
        }
        Value::Undefined
    }
}

impl fmt::Debug for PartialExports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialExports")
            .field("guarded", &self.is_guarded())
            .field("keys", &self.object.keys())
            .finish()
    }
}

/// The exports a requester should see for `module`.
///
/// Loaded modules return their exports unchanged. A loading module whose
/// exports are still a plain object gets a guarded view; anything else
/// (a function, a primitive, an interop namespace or an object marked
/// `__esModule`) is returned as-is.
pub fn view_of(module: &Module, diagnostics: &Diagnostics) -> Value {
    let exports = module.exports();
    if module.is_loaded() {
        return exports.clone();
    }
    match exports {
        Value::Object(object) if object.is_plain() && !object.has("__esModule") => {
            Value::Partial(PartialExports {
                object: object.clone(),
                state: module.load_state().clone(),
                diagnostics: diagnostics.clone(),
            })
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::WarningKind;
    use crate::module_system::module::ModuleId;
    use crate::value::ObjectKind;
    use std::path::PathBuf;

    fn loading_module() -> Module {
        Module::new(ModuleId::new(0), PathBuf::from("/app/a.js"), None)
    }

    #[test]
    fn test_guard_warns_on_missing_property() {
        let diagnostics = Diagnostics::new();
        let module = loading_module();
        module.exports().set("early", 1);

        let view = view_of(&module, &diagnostics);
        assert!(matches!(view, Value::Partial(_)));
        assert_eq!(view.get("early"), Value::from(1));
        assert!(diagnostics.is_empty());

        assert!(view.get("late").is_undefined());
        let warnings = diagnostics.take();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::CircularRequire);
        assert!(warnings[0].message.contains("'late'"));
    }

    #[test]
    fn test_es_module_marker_is_exempt() {
        let diagnostics = Diagnostics::new();
        let module = loading_module();

        let view = view_of(&module, &diagnostics);
        assert!(view.get("__esModule").is_undefined());
        assert!(diagnostics.is_empty());

        module.exports().set("__esModule", true);
        assert!(matches!(view_of(&module, &diagnostics), Value::Object(_)));
    }

    #[test]
    fn test_view_becomes_transparent_after_load() {
        let diagnostics = Diagnostics::new();
        let module = loading_module();
        let view = view_of(&module, &diagnostics);

        module.load_state().mark_loaded();
        assert!(view.get("missing").is_undefined());
        assert!(diagnostics.is_empty());
        assert!(matches!(view_of(&module, &diagnostics), Value::Object(_)));
    }

    #[test]
    fn test_non_plain_exports_are_not_guarded() {
        let diagnostics = Diagnostics::new();
        let mut module = loading_module();
        module.set_exports(Value::Object(ObjectRef::with_kind(ObjectKind::Namespace)));
        assert!(matches!(view_of(&module, &diagnostics), Value::Object(_)));

        module.set_exports(Value::from("primitive"));
        assert_eq!(view_of(&module, &diagnostics), Value::from("primitive"));
    }
}
