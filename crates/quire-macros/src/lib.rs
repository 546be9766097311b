// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Small declarative macros shared by the quire crates.
//!
//! # Macros Overview
//!
//! - [`defer!`] - Execute code on scope exit (like Go's defer)
//! - [`object!`] - Build an ordered property list, collected into any
//!   `FromIterator<(String, V)>` target such as an exports object
//!
//! # Examples
//!
//! ```
//! use quire_macros::*;
//! use std::cell::RefCell;
//!
//! let log = RefCell::new(Vec::new());
//!
//! {
//!     log.borrow_mut().push("start");
//!     defer!(log.borrow_mut().push("cleanup"));
//!     log.borrow_mut().push("work");
//! }
//!
//! assert_eq!(*log.borrow(), vec!["start", "work", "cleanup"]);
//! ```

#![warn(missing_docs)]

mod control;
mod object;

/// Helper struct for the [`defer!`] macro.
#[doc(hidden)]
pub struct DeferGuard<F: FnOnce()>(pub Option<F>);

impl<F: FnOnce()> Drop for DeferGuard<F> {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}
