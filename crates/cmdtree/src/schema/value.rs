//! Value types and runtime values of configuration fields.

use serde::{Serialize, Serializer};
use std::fmt;

/// The declared type of a [`ConfigField`](super::ConfigField).
///
/// The set is deliberately closed: every type here maps to exactly one clap
/// value parser and one JSON representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    /// Enumerated string restricted to the listed values.
    Choice(Vec<String>),
    /// Repeated string values.
    StringList,
    /// A scalar that may be absent. Resolves to [`Value::Null`] when nothing
    /// supplies it.
    Optional(Box<ValueType>),
}

impl ValueType {
    /// Shorthand for `ValueType::Choice` from any string-ish iterator.
    pub fn choice<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValueType::Choice(values.into_iter().map(Into::into).collect())
    }

    /// Shorthand for `ValueType::Optional`.
    pub fn optional(inner: ValueType) -> Self {
        match inner {
            already @ ValueType::Optional(_) => already,
            other => ValueType::Optional(Box::new(other)),
        }
    }

    /// The type with any `Optional` wrapper removed.
    pub fn base(&self) -> &ValueType {
        match self {
            ValueType::Optional(inner) => inner.base(),
            other => other,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, ValueType::Optional(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.base(), ValueType::StringList)
    }

    pub fn is_flag(&self) -> bool {
        matches!(self.base(), ValueType::Boolean)
    }

    /// Returns true if a descendant may redeclare a field of type `self`
    /// with type `other`.
    ///
    /// Types must match exactly, except that a choice may narrow to a subset
    /// of the ancestor's values.
    pub fn accepts_override(&self, other: &ValueType) -> bool {
        match (self, other) {
            (ValueType::Choice(ancestor), ValueType::Choice(descendant)) => {
                descendant.iter().all(|v| ancestor.contains(v))
            }
            (ValueType::Optional(a), ValueType::Optional(b)) => a.accepts_override(b),
            (a, b) => a == b,
        }
    }

    /// Checks that `value` is valid for this type, coercing integers to
    /// floats where needed.
    pub fn coerce(&self, value: Value) -> Result<Value, String> {
        match (self, value) {
            (ValueType::Optional(_), Value::Null) => Ok(Value::Null),
            (ValueType::Optional(inner), value) => inner.coerce(value),
            (ValueType::String, Value::Str(s)) => Ok(Value::Str(s)),
            (ValueType::Integer, Value::Int(i)) => Ok(Value::Int(i)),
            (ValueType::Float, Value::Float(f)) => Ok(Value::Float(f)),
            (ValueType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
            (ValueType::Boolean, Value::Bool(b)) => Ok(Value::Bool(b)),
            (ValueType::StringList, Value::List(items)) => Ok(Value::List(items)),
            (ValueType::StringList, Value::Str(s)) => Ok(Value::List(vec![s])),
            (ValueType::Choice(choices), Value::Str(s)) => {
                if choices.contains(&s) {
                    Ok(Value::Str(s))
                } else {
                    Err(format!("'{}' is not one of [{}]", s, choices.join(", ")))
                }
            }
            (ty, value) => Err(format!("expected {}, found {}", ty, value.kind())),
        }
    }

    /// Parses a raw string (from the environment) into a value of this type.
    pub fn parse_str(&self, raw: &str) -> Result<Value, String> {
        match self {
            ValueType::Optional(inner) => inner.parse_str(raw),
            ValueType::String => Ok(Value::Str(raw.to_string())),
            ValueType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| format!("invalid integer '{}': {}", raw, e)),
            ValueType::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| format!("invalid float '{}': {}", raw, e)),
            ValueType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(Value::Bool(true)),
                "0" | "false" | "no" | "off" => Ok(Value::Bool(false)),
                _ => Err(format!("invalid boolean '{}'", raw)),
            },
            ValueType::StringList => Ok(Value::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            )),
            ValueType::Choice(_) => self.coerce(Value::Str(raw.to_string())),
        }
    }

    /// The value a non-required field takes when nothing supplies one.
    ///
    /// Flags are off, lists are empty, everything else is `Null`.
    pub fn implicit_value(&self) -> Option<Value> {
        match self {
            ValueType::Boolean => Some(Value::Bool(false)),
            ValueType::StringList => Some(Value::List(Vec::new())),
            ValueType::Optional(_) => Some(Value::Null),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => f.write_str("string"),
            ValueType::Integer => f.write_str("integer"),
            ValueType::Float => f.write_str("float"),
            ValueType::Boolean => f.write_str("boolean"),
            ValueType::Choice(values) => write!(f, "choice[{}]", values.join("|")),
            ValueType::StringList => f.write_str("list"),
            ValueType::Optional(inner) => write!(f, "optional<{}>", inner),
        }
    }
}

/// A resolved configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<String>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::from(items.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("none"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}
