//! `PropertyValue`: the scalar/array/nested-map/null tagged value backing
//! [`crate::feature::Feature::properties`] and the schema builder's input.
//!
//! Mirrors `serde_json::Value` but keeps a typed `Long`/`Double`/`Bool`/
//! `String` distinction at the leaves the same way `geozero::ColumnValue`
//! does, so the schema builder does not have to
//! re-derive integer-vs-float from a `serde_json::Number` at every call
//! site.

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    pub fn from_json(value: &Value) -> PropertyValue {
        match value {
            Value::Null => PropertyValue::Null,
            Value::Bool(b) => PropertyValue::Bool(*b),
            Value::Number(n) => PropertyValue::from_json_number(n),
            Value::String(s) => PropertyValue::String(s.clone()),
            Value::Array(items) => {
                PropertyValue::Array(items.iter().map(PropertyValue::from_json).collect())
            }
            Value::Object(obj) => PropertyValue::Map(
                obj.iter()
                    .map(|(k, v)| (k.clone(), PropertyValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    fn from_json_number(n: &Number) -> PropertyValue {
        if let Some(i) = n.as_i64() {
            if i32::try_from(i).is_ok() {
                PropertyValue::Int(i as i32)
            } else {
                PropertyValue::Long(i)
            }
        } else {
            PropertyValue::Double(n.as_f64().unwrap_or(0.0))
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Null => Value::Null,
            PropertyValue::Bool(b) => Value::Bool(*b),
            PropertyValue::Int(i) => Value::Number((*i).into()),
            PropertyValue::Long(l) => Value::Number((*l).into()),
            PropertyValue::Double(d) => serde_json::Number::from_f64(*d)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::Array(items) => {
                Value::Array(items.iter().map(PropertyValue::to_json).collect())
            }
            PropertyValue::Map(map) => {
                let mut obj = Map::new();
                for (k, v) in map {
                    obj.insert(k.clone(), v.to_json());
                }
                Value::Object(obj)
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// A short label for the runtime "kind" of this value, used in
    /// `MixedScalarTypes`/`MixedElementTypes` error messages.
    pub fn kind_label(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "i32",
            PropertyValue::Long(_) => "i64",
            PropertyValue::Double(_) => "f64",
            PropertyValue::String(_) => "string",
            PropertyValue::Array(_) => "array",
            PropertyValue::Map(_) => "map",
        }
    }
}

pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Convert a `serde_json::Map` (as found in a GeoJSON `"properties"` object)
/// into a [`PropertyMap`].
pub fn properties_from_json(obj: &Map<String, Value>) -> PropertyMap {
    obj.iter()
        .map(|(k, v)| (k.clone(), PropertyValue::from_json(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_that_fit_i32_stay_int() {
        let v = PropertyValue::from_json(&serde_json::json!(42));
        assert_eq!(v, PropertyValue::Int(42));
    }

    #[test]
    fn large_integers_become_long() {
        let v = PropertyValue::from_json(&serde_json::json!(5_000_000_000i64));
        assert_eq!(v, PropertyValue::Long(5_000_000_000));
    }

    #[test]
    fn floats_become_double() {
        let v = PropertyValue::from_json(&serde_json::json!(1.5));
        assert_eq!(v, PropertyValue::Double(1.5));
    }
}
