// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Object literal macro.

/// Create a JavaScript-style object literal.
///
/// Keys become `String`s and values are converted with `Into`, so the
/// target type decides the value representation. Insertion order is kept.
///
/// # Example
///
/// ```
/// use quire_macros::object;
///
/// let props: Vec<(String, String)> = object! {
///     "name" => "Alice",
///     "role" => "admin",
/// };
/// assert_eq!(props[0], ("name".to_string(), "Alice".to_string()));
///
/// let empty: Vec<(String, i64)> = object! {};
/// assert!(empty.is_empty());
/// ```
#[macro_export]
macro_rules! object {
    () => {
        ::core::iter::FromIterator::from_iter(::std::vec::Vec::<(::std::string::String, _)>::new())
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        ::core::iter::FromIterator::from_iter([
            $((::std::string::String::from($key), ::core::convert::Into::into($value))),+
        ])
    };
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    #[test]
    fn test_object_collects_into_map() {
        let map: BTreeMap<String, f64> = object! {
            "b" => 2.0,
            "a" => 1.0,
        };
        assert_eq!(map.get("a"), Some(&1.0));
        assert_eq!(map.len(), 2);
    }
}
