// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Values exchanged between the module system and its host engine
//!
//! Exports are shared, mutable containers: two `require()` calls for the
//! same module must observe the very same object, so objects, arrays and
//! functions are reference-counted handles compared by identity.

use crate::error::Result;
use crate::module_system::PartialExports;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Signature of host functions stored in a [`Value::Function`]
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// A callable host function
#[derive(Clone)]
pub struct NativeFunction {
    name: Arc<str>,
    func: Arc<NativeFn>,
}

impl NativeFunction {
    /// Wrap a closure as a function value
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    /// Function name (may be empty)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.func)(args)
    }

    /// Reference identity
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function: {}]", self.name)
    }
}

/// What produced an object; only `Plain` objects get a circular guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Default-shape container (`{}` / the initial `module.exports`)
    Plain,
    /// Namespace object returned by the ESM importer
    Namespace,
    /// Engine-defined object with a custom prototype
    Host,
}

#[derive(Debug)]
struct Object {
    kind: ObjectKind,
    properties: Vec<(String, Value)>,
}

/// Shared handle to an ordered property bag
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<Object>>);

impl ObjectRef {
    /// Create an empty plain object
    pub fn new() -> Self {
        Self::with_kind(ObjectKind::Plain)
    }

    /// Create an empty object of the given kind
    pub fn with_kind(kind: ObjectKind) -> Self {
        Self(Arc::new(RwLock::new(Object {
            kind,
            properties: Vec::new(),
        })))
    }

    /// Create a module namespace object from its bindings
    pub fn namespace(bindings: impl IntoIterator<Item = (String, Value)>) -> Self {
        let ns = Self::with_kind(ObjectKind::Namespace);
        for (key, value) in bindings {
            ns.set(key, value);
        }
        ns
    }

    /// Object kind
    pub fn kind(&self) -> ObjectKind {
        self.0.read().kind
    }

    /// Whether this is a default-shape container
    pub fn is_plain(&self) -> bool {
        self.kind() == ObjectKind::Plain
    }

    /// Own property lookup
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0
            .read()
            .properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Whether the object has an own property `key`
    pub fn has(&self, key: &str) -> bool {
        self.0.read().properties.iter().any(|(k, _)| k == key)
    }

    /// Set (or overwrite) a property, keeping first-insertion order
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let mut obj = self.0.write();
        match obj.properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => obj.properties.push((key, value)),
        }
    }

    /// Remove a property, returning whether it existed
    pub fn delete(&self, key: &str) -> bool {
        let mut obj = self.0.write();
        let before = obj.properties.len();
        obj.properties.retain(|(k, _)| k != key);
        obj.properties.len() != before
    }

    /// Property names in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.0.read().properties.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Snapshot of all properties
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0.read().properties.clone()
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.0.read().properties.len()
    }

    /// Whether the object has no properties
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reference identity
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.clone()))
    }
}

impl FromIterator<(String, Value)> for ObjectRef {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let obj = ObjectRef::new();
        for (key, value) in iter {
            obj.set(key, value);
        }
        obj
    }
}

/// Shared handle to an array
#[derive(Clone, Default)]
pub struct ArrayRef(Arc<RwLock<Vec<Value>>>);

impl ArrayRef {
    /// Create an empty array
    pub fn new() -> Self {
        Self::default()
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().get(index).cloned()
    }

    /// Append an element
    pub fn push(&self, value: impl Into<Value>) {
        self.0.write().push(value.into());
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Whether the array is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the elements
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    /// Reference identity
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl FromIterator<Value> for ArrayRef {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(Arc::new(RwLock::new(iter.into_iter().collect())))
    }
}

/// A JavaScript value as seen by the module system
#[derive(Clone)]
pub enum Value {
    /// undefined
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Array reference
    Array(ArrayRef),
    /// Object reference
    Object(ObjectRef),
    /// Function reference
    Function(NativeFunction),
    /// Exports of a module that is still loading
    Partial(PartialExports),
}

impl Value {
    /// A fresh empty plain object
    pub fn new_object() -> Self {
        Value::Object(ObjectRef::new())
    }

    /// Check if value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean value, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The underlying object, looking through partial views
    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj.clone()),
            Value::Partial(partial) => Some(partial.object().clone()),
            _ => None,
        }
    }

    /// The function, if this is one
    pub fn as_function(&self) -> Option<&NativeFunction> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Property access (`value[key]`)
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(obj) => obj.get(key).unwrap_or(Value::Undefined),
            Value::Partial(partial) => partial.get(key),
            Value::Array(arr) => {
                if key == "length" {
                    Value::Number(arr.len() as f64)
                } else {
                    key.parse::<usize>()
                        .ok()
                        .and_then(|i| arr.get(i))
                        .unwrap_or(Value::Undefined)
                }
            }
            Value::String(s) if key == "length" => Value::Number(s.encode_utf16().count() as f64),
            Value::Function(f) if key == "name" => Value::String(f.name().to_string()),
            _ => Value::Undefined,
        }
    }

    /// Property assignment; returns false for values without properties
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        match self.as_object() {
            Some(obj) => {
                obj.set(key, value);
                true
            }
            None => false,
        }
    }

    /// SameValue comparison: identity for references, value for primitives
    pub fn same(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Boolean(x), Value::Boolean(y)) => x == y,
            (Value::Number(x), Value::Number(y)) => {
                (x.is_nan() && y.is_nan()) || x.to_bits() == y.to_bits()
            }
            (Value::String(x), Value::String(y)) => x == y,
            (Value::Array(x), Value::Array(y)) => x.ptr_eq(y),
            (Value::Function(x), Value::Function(y)) => x.ptr_eq(y),
            _ => match (a.as_object(), b.as_object()) {
                (Some(x), Some(y)) => x.ptr_eq(&y),
                _ => false,
            },
        }
    }

    /// Short description used in argument errors
    pub fn describe(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => format!("type boolean ({})", b),
            Value::Number(n) => format!("type number ({})", format_number(*n)),
            Value::String(s) => format!("type string ('{}')", s),
            Value::Array(_) => "an instance of Array".to_string(),
            Value::Object(_) | Value::Partial(_) => "an instance of Object".to_string(),
            Value::Function(f) => format!("function {}", f.name()),
        }
    }

    /// Convert parsed JSON into a value
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(obj) => Value::Object(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON; functions and undefined become null, cycles become "[Circular]"
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_inner(&mut Vec::new())
    }

    fn to_json_inner(&self, seen: &mut Vec<usize>) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null | Value::Function(_) => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(arr) => {
                if seen.contains(&arr.addr()) {
                    return serde_json::Value::String("[Circular]".to_string());
                }
                seen.push(arr.addr());
                let items = arr.to_vec().iter().map(|v| v.to_json_inner(seen)).collect();
                seen.pop();
                serde_json::Value::Array(items)
            }
            Value::Object(_) | Value::Partial(_) => {
                let Some(obj) = self.as_object() else {
                    return serde_json::Value::Null;
                };
                if seen.contains(&obj.addr()) {
                    return serde_json::Value::String("[Circular]".to_string());
                }
                seen.push(obj.addr());
                let map = obj
                    .entries()
                    .into_iter()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(k, v)| (k, v.to_json_inner(seen)))
                    .collect();
                seen.pop();
                serde_json::Value::Object(map)
            }
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "'{}'", s),
            Value::Array(arr) => {
                if depth > 2 {
                    return write!(f, "[Array]");
                }
                write!(f, "[")?;
                for (i, item) in arr.to_vec().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_nested(f, depth + 1)?;
                }
                write!(f, "]")
            }
            Value::Object(_) | Value::Partial(_) => {
                let Some(obj) = self.as_object() else {
                    return Ok(());
                };
                if depth > 2 {
                    return write!(f, "[Object]");
                }
                let entries = obj.entries();
                if obj.kind() == ObjectKind::Namespace {
                    write!(f, "[Module: null prototype] ")?;
                }
                if entries.is_empty() {
                    return write!(f, "{{}}");
                }
                write!(f, "{{ ")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", key)?;
                    value.fmt_nested(f, depth + 1)?;
                }
                write!(f, " }}")
            }
            other => write!(f, "{}", other),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Function(func) => write!(f, "{:?}", func),
            Value::Array(_) | Value::Object(_) | Value::Partial(_) => self.fmt_nested(f, 0),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        Value::same(self, other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<ArrayRef> for Value {
    fn from(arr: ArrayRef) -> Self {
        Value::Array(arr)
    }
}

impl From<NativeFunction> for Value {
    fn from(f: NativeFunction) -> Self {
        Value::Function(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_macros::object;

    #[test]
    fn test_object_identity() {
        let a = Value::new_object();
        let b = a.clone();
        let c = Value::new_object();
        assert!(Value::same(&a, &b));
        assert!(!Value::same(&a, &c));
    }

    #[test]
    fn test_object_set_keeps_order() {
        let obj: ObjectRef = object! {
            "b" => 1,
            "a" => 2,
        };
        obj.set("b", 3);
        assert_eq!(obj.keys(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(obj.get("b"), Some(Value::Number(3.0)));
    }

    #[test]
    fn test_from_json() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"name":"pkg","list":[1,true,null]}"#).unwrap();
        let value = Value::from_json(&json);
        assert_eq!(value.get("name"), Value::from("pkg"));
        assert_eq!(value.get("list").get("length"), Value::from(3));
        assert_eq!(value.get("list").get("1"), Value::from(true));
        assert!(value.get("missing").is_undefined());
    }

    #[test]
    fn test_display() {
        let obj: ObjectRef = object! {
            "a" => 1,
            "s" => "x",
        };
        assert_eq!(Value::Object(obj).to_string(), "{ a: 1, s: 'x' }");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(Value::new_object().to_string(), "{}");
    }

    #[test]
    fn test_to_json_handles_cycles() {
        let obj = ObjectRef::new();
        obj.set("self", obj.clone());
        let json = Value::Object(obj).to_json();
        assert_eq!(json["self"], serde_json::Value::String("[Circular]".to_string()));
    }

    #[test]
    fn test_describe() {
        assert_eq!(Value::Number(1.0).describe(), "type number (1)");
        assert_eq!(Value::Undefined.describe(), "undefined");
    }
}
