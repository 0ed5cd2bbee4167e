//! Serde implementations for [`Value`].
//!
//! A `Value` serializes as the JSON it mirrors: no tags, no wrappers.
//! Deserialization goes through `serde_json::Value`, which keeps the
//! mapping in one place ([`Value::from_json`]).

use crate::array::Array;
use crate::object::Object;
use crate::value::Value;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(a) => a.serialize(serializer),
            Self::Object(o) => o.serialize(serializer),
        }
    }
}

impl Serialize for Array {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for value in self.iter() {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.entries() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(&json))
    }
}

impl<'de> Deserialize<'de> for Array {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Array(a) => Ok(a),
            other => Err(serde::de::Error::custom(format!(
                "expected array, got {}",
                other.kind()
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Object {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Object(o) => Ok(o),
            other => Err(serde::de::Error::custom(format!(
                "expected object, got {}",
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn value_serializes_as_plain_json() {
        let v = Value::Object(
            Object::new()
                .insert("name", Value::string("ana"))
                .insert("ok", Value::boolean(true)),
        );
        let json: serde_json::Value = serde_json::to_value(&v).unwrap();
        assert_eq!(json, serde_json::json!({"name": "ana", "ok": true}));
    }

    #[test]
    fn value_roundtrip() {
        let json = serde_json::json!({
            "items": [1.0, "two", null],
            "nested": {"deep": false}
        });
        let v: Value = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(serde_json::to_value(&v).unwrap(), json);
    }

    #[test]
    fn object_deserialize_rejects_non_object() {
        let result: Result<Object, _> = serde_json::from_str("[1, 2]");
        assert!(result.is_err());
    }

    #[test]
    fn array_deserialize_rejects_non_array() {
        let result: Result<Array, _> = serde_json::from_str(r#"{"a": 1}"#);
        assert!(result.is_err());
    }
}
