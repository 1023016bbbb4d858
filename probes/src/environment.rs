use std::{collections::HashMap, sync::Arc};

use crate::Name;

/// A value stored in an [`Environment`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Long(i64),
    Boolean(bool),
    Int(i32),
    Double(f64),
    String(Arc<str>),
    Name(Name),
}

/// Hierarchical, typed key/value store keyed by [`Name`].
///
/// Every thread [`Context`](crate::Context) owns one, seeded from the
/// runtime's configuration environment, which is also the one handed to
/// extension factories on `init`.
///
/// Lookups by name are exact, except for [`contains`](Environment::contains)
/// and [`remove`](Environment::remove), which also match every value stored
/// under a name that has the argument as a prefix.
///
/// A value explicitly set to null is still *contained*, but
/// [`is_null`](Environment::is_null) reports true for it, just as it does for
/// a missing one.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<Name, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a value is stored under `name` or under any name it prefixes.
    pub fn contains(&self, name: &Name) -> bool {
        self.values.contains_key(name) || self.values.keys().any(|key| key.starts_with(name))
    }

    /// Removes the value stored under `name` and all values stored beneath it.
    pub fn remove(&mut self, name: &Name) {
        self.values.retain(|key, _| !key.starts_with(name));
    }

    pub fn set_null(&mut self, name: &Name) {
        self.set(name, Value::Null);
    }

    /// True if no value is stored under `name` or the stored value is null.
    pub fn is_null(&self, name: &Name) -> bool {
        matches!(self.values.get(name), None | Some(Value::Null))
    }

    pub fn get(&self, name: &Name) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: &Name, value: Value) {
        self.values.insert(name.clone(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Value)> {
        self.values.iter()
    }

    /// The `long` value under `name`; `Int` values are widened. Zero if unset.
    pub fn long(&self, name: &Name) -> i64 {
        self.long_or(name, 0)
    }

    pub fn long_or(&self, name: &Name, default: i64) -> i64 {
        match self.values.get(name) {
            Some(Value::Long(v)) => *v,
            Some(Value::Int(v)) => i64::from(*v),
            _ => default,
        }
    }

    pub fn set_long(&mut self, name: &Name, value: i64) {
        self.set(name, Value::Long(value));
    }

    pub fn boolean(&self, name: &Name) -> bool {
        self.boolean_or(name, false)
    }

    pub fn boolean_or(&self, name: &Name, default: bool) -> bool {
        match self.values.get(name) {
            Some(Value::Boolean(v)) => *v,
            _ => default,
        }
    }

    pub fn set_boolean(&mut self, name: &Name, value: bool) {
        self.set(name, Value::Boolean(value));
    }

    pub fn int(&self, name: &Name) -> i32 {
        self.int_or(name, 0)
    }

    pub fn int_or(&self, name: &Name, default: i32) -> i32 {
        match self.values.get(name) {
            Some(Value::Int(v)) => *v,
            _ => default,
        }
    }

    pub fn set_int(&mut self, name: &Name, value: i32) {
        self.set(name, Value::Int(value));
    }

    /// The `double` value under `name`; integral values are converted.
    pub fn double(&self, name: &Name) -> f64 {
        self.double_or(name, 0.0)
    }

    pub fn double_or(&self, name: &Name, default: f64) -> f64 {
        match self.values.get(name) {
            Some(Value::Double(v)) => *v,
            Some(Value::Int(v)) => f64::from(*v),
            Some(Value::Long(v)) => *v as f64,
            _ => default,
        }
    }

    pub fn set_double(&mut self, name: &Name, value: f64) {
        self.set(name, Value::Double(value));
    }

    pub fn string(&self, name: &Name) -> Option<&str> {
        match self.values.get(name) {
            Some(Value::String(v)) => Some(v),
            _ => None,
        }
    }

    pub fn string_or<'a>(&'a self, name: &Name, default: &'a str) -> &'a str {
        self.string(name).unwrap_or(default)
    }

    pub fn set_string(&mut self, name: &Name, value: &str) {
        self.set(name, Value::String(Arc::from(value)));
    }

    pub fn name(&self, name: &Name) -> Option<&Name> {
        match self.values.get(name) {
            Some(Value::Name(v)) => Some(v),
            _ => None,
        }
    }

    pub fn name_or<'a>(&'a self, name: &Name, default: &'a Name) -> &'a Name {
        self.name(name).unwrap_or(default)
    }

    pub fn set_name(&mut self, name: &Name, value: &Name) {
        self.set(name, Value::Name(value.clone()));
    }
}
