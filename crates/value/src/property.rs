//! Component configuration properties.

use crate::error::ValueError;
use crate::value::Value;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A component configuration value.
///
/// Properties are authored in the flow document and fixed for the life of
/// a flow. The [`Property::Expression`] variant defers evaluation to
/// dispatch time, when the expression runs against the live execution
/// context; all other variants are literals.
///
/// In the persisted document an expression is a string starting with `=`
/// (`"=order.total > 100"`), so plain JSON stays authorable by hand.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// Literal string.
    String(String),
    /// Literal number.
    Number(f64),
    /// Literal boolean.
    Boolean(bool),
    /// Deferred expression source, evaluated against a context.
    Expression(String),
    /// Map of nested properties.
    Object(BTreeMap<String, Property>),
    /// List of nested properties.
    Array(Vec<Property>),
}

impl Property {
    /// The expression source if this is an expression.
    #[must_use]
    pub fn expression_source(&self) -> Option<&str> {
        match self {
            Self::Expression(src) => Some(src),
            _ => None,
        }
    }

    /// The string payload if this is a literal string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric payload if this is a literal number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean payload if this is a literal boolean.
    #[must_use]
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns `true` if this property or any nested property is a
    /// deferred expression.
    #[must_use]
    pub fn contains_expression(&self) -> bool {
        match self {
            Self::Expression(_) => true,
            Self::Object(map) => map.values().any(Property::contains_expression),
            Self::Array(items) => items.iter().any(Property::contains_expression),
            _ => false,
        }
    }

    /// Convert to a [`Value`] without evaluation. Fails with
    /// [`ValueError::DeferredExpression`] if any nested property is an
    /// expression.
    pub fn as_literal(&self) -> Result<Value, ValueError> {
        match self {
            Self::String(s) => Ok(Value::string(s)),
            Self::Number(n) => Ok(Value::Number(*n)),
            Self::Boolean(b) => Ok(Value::Boolean(*b)),
            Self::Expression(_) => Err(ValueError::DeferredExpression),
            Self::Object(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), v.as_literal()?)))
                .collect::<Result<_, _>>()
                .map(Value::Object),
            Self::Array(items) => items
                .iter()
                .map(Property::as_literal)
                .collect::<Result<_, _>>()
                .map(Value::Array),
        }
    }

    fn from_json(json: &serde_json::Value) -> Result<Self, String> {
        match json {
            serde_json::Value::Null => {
                Err("null is not a valid property; omit the key instead".to_string())
            }
            serde_json::Value::Bool(b) => Ok(Self::Boolean(*b)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Self::Number)
                .ok_or_else(|| format!("number out of range: {n}")),
            serde_json::Value::String(s) => Ok(match s.strip_prefix('=') {
                Some(src) => Self::Expression(src.to_string()),
                None => Self::String(s.clone()),
            }),
            serde_json::Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Result<_, _>>()
                .map(Self::Array),
            serde_json::Value::Object(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), Self::from_json(v)?)))
                .collect::<Result<_, _>>()
                .map(Self::Object),
        }
    }
}

impl Serialize for Property {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Expression(src) => serializer.serialize_str(&format!("={src}")),
            Self::Object(map) => {
                let mut ser = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    ser.serialize_entry(k, v)?;
                }
                ser.end()
            }
            Self::Array(items) => {
                let mut ser = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    ser.serialize_element(item)?;
                }
                ser.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Property {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&json).map_err(serde::de::Error::custom)
    }
}
