// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Scope guard macros.

/// Defer execution until scope exit (like Go's defer).
///
/// The deferred block also runs when the scope is left early through `?`
/// or `return`, which makes it suitable for balancing counters around a
/// fallible call.
///
/// # Example
///
/// ```
/// use quire_macros::defer;
/// use std::cell::Cell;
///
/// fn fallible(depth: &Cell<usize>, fail: bool) -> Result<(), String> {
///     depth.set(depth.get() + 1);
///     defer!(depth.set(depth.get() - 1));
///     if fail {
///         return Err("boom".into());
///     }
///     Ok(())
/// }
///
/// let depth = Cell::new(0);
/// assert!(fallible(&depth, true).is_err());
/// assert_eq!(depth.get(), 0);
/// ```
#[macro_export]
macro_rules! defer {
    ($($body:tt)*) => {
        let _guard = $crate::DeferGuard(Some(|| { $($body)* }));
    };
}
