//! The unified `Value` enum.

use crate::array::Array;
use crate::error::ValueError;
use crate::object::Object;
use std::fmt;
use std::sync::Arc;

/// Fixed per-value overhead used by [`Value::estimated_size`].
///
/// Covers the discriminant plus inline payload of scalar variants. The
/// figure only has to be stable and monotone, not exact: quota accounting
/// compares against configured byte budgets, never against allocator
/// truth.
pub(crate) const VALUE_OVERHEAD: u64 = 8;

/// A value held in execution variables or exchanged with host services.
///
/// Values are immutable. Collection variants are persistent structures,
/// so cloning a `Value` never deep-copies.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent / null.
    #[default]
    Null,
    /// Boolean.
    Boolean(bool),
    /// Number (IEEE 754 double, like the document format).
    Number(f64),
    /// UTF-8 string. `Arc`-backed so clones are pointer copies.
    String(Arc<str>),
    /// Ordered list of values.
    Array(Array),
    /// Key-value map.
    Object(Object),
}

/// Discriminant of a [`Value`], used in error messages and type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`Value::Null`]
    Null,
    /// [`Value::Boolean`]
    Boolean,
    /// [`Value::Number`]
    Number,
    /// [`Value::String`]
    String,
    /// [`Value::Array`]
    Array,
    /// [`Value::Object`]
    Object,
}

impl ValueKind {
    /// Human-readable name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// Create a string value.
    pub fn string(s: impl AsRef<str>) -> Self {
        Self::String(Arc::from(s.as_ref()))
    }

    /// Create a number value.
    #[must_use]
    pub const fn number(n: f64) -> Self {
        Self::Number(n)
    }

    /// Create a boolean value.
    #[must_use]
    pub const fn boolean(b: bool) -> Self {
        Self::Boolean(b)
    }

    /// The kind of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Number(_) => ValueKind::Number,
            Self::String(_) => ValueKind::String,
            Self::Array(_) => ValueKind::Array,
            Self::Object(_) => ValueKind::Object,
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The boolean payload, if this is a boolean.
    #[must_use]
    pub const fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The numeric payload, if this is a number.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The string payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The object payload, if this is an object.
    #[must_use]
    pub const fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The array payload, if this is an array.
    #[must_use]
    pub const fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Estimated byte weight of this value.
    ///
    /// Strings count their UTF-8 length, collections sum their elements
    /// (plus key weights for objects), and every value carries
    /// [`VALUE_OVERHEAD`]. Feeds the context-size and per-variable quotas.
    #[must_use]
    pub fn estimated_size(&self) -> u64 {
        match self {
            Self::Null | Self::Boolean(_) | Self::Number(_) => VALUE_OVERHEAD,
            Self::String(s) => VALUE_OVERHEAD + s.len() as u64,
            Self::Array(a) => {
                VALUE_OVERHEAD + a.iter().map(Value::estimated_size).sum::<u64>()
            }
            Self::Object(o) => {
                VALUE_OVERHEAD
                    + o.entries()
                        .map(|(k, v)| k.len() as u64 + v.estimated_size())
                        .sum::<u64>()
            }
        }
    }

    /// Convert from a parsed JSON value. Lossless except that JSON
    /// integers become `f64`, matching the document format.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(*b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::string(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s.to_string()),
            Self::Array(a) => {
                serde_json::Value::Array(a.iter().map(Value::to_json).collect())
            }
            Self::Object(o) => serde_json::Value::Object(
                o.entries()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Navigate one object key, erroring on non-objects.
    pub fn try_get(&self, key: &str) -> Result<&Value, ValueError> {
        match self {
            Self::Object(o) => o
                .get(key)
                .ok_or_else(|| ValueError::KeyNotFound(key.to_string())),
            other => Err(ValueError::TypeMismatch {
                expected: ValueKind::Object,
                actual: other.kind(),
            }),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Arc::from(s.as_str()))
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Self::Object(o)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Self::Array(a)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Array(_) | Self::Object(_) => write!(f, "{}", self.to_json()),
        }
    }
}
