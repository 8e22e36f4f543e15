//! Property values as a closed sum type

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The value domains a property can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Int,
    Real,
    /// Enum-like identifier, stored as its ordinal
    Enum,
    Text,
}

impl ValueType {
    /// The zero value of this type
    pub fn zero(self) -> PropertyValue {
        match self {
            ValueType::Bool => PropertyValue::Bool(false),
            ValueType::Int => PropertyValue::Int(0),
            ValueType::Real => PropertyValue::Real(OrderedFloat(0.0)),
            ValueType::Enum => PropertyValue::Enum(0),
            ValueType::Text => PropertyValue::Text(String::new()),
        }
    }
}

/// A property value.
///
/// Reals are wrapped in `OrderedFloat` so values can be hashed and ordered,
/// which partitions rely on for labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Real(OrderedFloat<f64>),
    Enum(u32),
    Text(String),
}

impl PropertyValue {
    pub fn real(value: f64) -> Self {
        PropertyValue::Real(OrderedFloat(value))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyValue::Bool(_) => ValueType::Bool,
            PropertyValue::Int(_) => ValueType::Int,
            PropertyValue::Real(_) => ValueType::Real,
            PropertyValue::Enum(_) => ValueType::Enum,
            PropertyValue::Text(_) => ValueType::Text,
        }
    }

    /// Reals must be finite; everything else always is
    pub fn is_finite(&self) -> bool {
        match self {
            PropertyValue::Real(value) => value.0.is_finite(),
            _ => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            PropertyValue::Real(value) => Some(value.0),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<u32> {
        match self {
            PropertyValue::Enum(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(value) => write!(f, "{}", value),
            PropertyValue::Int(value) => write!(f, "{}", value),
            PropertyValue::Real(value) => write!(f, "{}", value.0),
            PropertyValue::Enum(value) => write!(f, "#{}", value),
            PropertyValue::Text(value) => write!(f, "{:?}", value),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::real(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_of_each_variant() {
        assert_eq!(PropertyValue::from(true).value_type(), ValueType::Bool);
        assert_eq!(PropertyValue::from(3i64).value_type(), ValueType::Int);
        assert_eq!(PropertyValue::from(0.5).value_type(), ValueType::Real);
        assert_eq!(PropertyValue::Enum(2).value_type(), ValueType::Enum);
        assert_eq!(PropertyValue::from("x").value_type(), ValueType::Text);
    }

    #[test]
    fn test_zero_matches_type() {
        for value_type in [ValueType::Bool, ValueType::Int, ValueType::Real, ValueType::Enum, ValueType::Text] {
            assert_eq!(value_type.zero().value_type(), value_type);
        }
    }

    #[test]
    fn test_non_finite_real_detected() {
        assert!(PropertyValue::real(1.0).is_finite());
        assert!(!PropertyValue::real(f64::NAN).is_finite());
        assert!(!PropertyValue::real(f64::INFINITY).is_finite());
        assert!(PropertyValue::Int(i64::MAX).is_finite());
    }

    #[test]
    fn test_values_are_ordered_within_type() {
        assert!(PropertyValue::Int(2) < PropertyValue::Int(5));
        assert!(PropertyValue::real(-1.0) < PropertyValue::real(0.25));
    }

    #[test]
    fn test_value_deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Holder {
            value: PropertyValue,
        }
        let holder: Holder = toml::from_str("value = { real = 2.5 }").unwrap();
        assert_eq!(holder.value, PropertyValue::real(2.5));
    }
}
