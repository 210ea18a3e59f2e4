//! Dynamic values stored in and read from observed targets.

use std::fmt;
use std::rc::Rc;

use super::facade::Object;
use super::key::{Key, Symbol, MAX_LENGTH};
use super::reference::Ref;

/// A dynamically typed value.
///
/// Equality (`==`) is strict equality: numbers compare numerically (so
/// `NaN != NaN` and `0.0 == -0.0`), objects and refs compare by identity.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Symbol(Symbol),
    Object(Object),
    Ref(Ref),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_ref_cell(&self) -> Option<&Ref> {
        match self {
            Value::Ref(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a sequence length: a non-negative integral number no
    /// larger than [`MAX_LENGTH`].
    pub fn as_length(&self) -> Option<usize> {
        match self {
            Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= MAX_LENGTH as f64 => {
                Some(*n as usize)
            }
            _ => None,
        }
    }

    /// Strip any facade, returning the raw target it wraps. Other values are
    /// returned unchanged.
    pub fn to_raw(&self) -> Value {
        match self {
            Value::Object(object) => Value::Object(object.to_raw()),
            other => other.clone(),
        }
    }

    /// Build a raw value from JSON. Objects become records, arrays become
    /// sequences.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s.as_str()),
            serde_json::Value::Array(items) => {
                Value::Object(Object::new_sequence(items.iter().map(Value::from_json)))
            }
            serde_json::Value::Object(map) => Value::Object(Object::new_record(
                map.iter()
                    .map(|(key, value)| (Key::from(key.as_str()), Value::from_json(value))),
            )),
        }
    }

    fn is_nan(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_nan())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Strict equality, except that `NaN` equals `NaN`.
pub fn same_value_zero(a: &Value, b: &Value) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Whether writing `new` over `old` is a change worth notifying.
pub fn has_changed(new: &Value, old: &Value) -> bool {
    !same_value_zero(new, old)
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Symbol(sym) => write!(f, "Symbol({sym})"),
            Value::Object(object) => object.fmt(f),
            Value::Ref(cell) => cell.fmt(f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::Symbol(sym) => write!(f, "{sym}"),
            Value::Object(object) => write!(f, "[object {:?}]", object.kind()),
            Value::Ref(_) => f.write_str("[object Ref]"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<Symbol> for Value {
    fn from(sym: Symbol) -> Self {
        Value::Symbol(sym)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<Ref> for Value {
    fn from(cell: Ref) -> Self {
        Value::Ref(cell)
    }
}

/// Set members and map keys read back as values.
impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Name(name) => Value::Str(name),
            Key::Index(index) => Value::from(index),
            Key::Symbol(sym) => Value::Symbol(sym),
            Key::Iterate | Key::MapKeyIterate => Value::Undefined,
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Undefined, Into::into)
    }
}
