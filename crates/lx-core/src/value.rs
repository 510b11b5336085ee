use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::{PrimitiveType, VariablePath};

pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnumValue {
    pub enum_name: String,
    pub member: String,
}

impl EnumValue {
    pub fn new(enum_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            enum_name: enum_name.into(),
            member: member.into(),
        }
    }

    /// Parses the `"Enum.Member"` tag form.
    pub fn parse_tag(tag: &str) -> Option<Self> {
        let (enum_name, member) = tag.split_once('.')?;
        if enum_name.is_empty() || member.is_empty() || member.contains('.') {
            return None;
        }
        Some(Self::new(enum_name, member))
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.enum_name, self.member)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(Decimal),
    String(String),
    Boolean(bool),
    Date(NaiveDateTime),
    Enum(EnumValue),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::Enum(_) => "enum",
            Self::Object(_) => "object",
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Object(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn get_path(&self, path: &VariablePath) -> Option<&Value> {
        let mut current = self;
        for segment in path.segments() {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn matches_primitive(&self, primitive: PrimitiveType) -> bool {
        matches!(
            (primitive, self),
            (PrimitiveType::Number, Self::Number(_))
                | (PrimitiveType::String, Self::String(_))
                | (PrimitiveType::Boolean, Self::Boolean(_))
                | (PrimitiveType::Date, Self::Date(_))
        )
    }

    /// Ordering used by comparisons and table lookups. Numbers compare as
    /// decimals; values of different kinds are unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) => Some(left.cmp(right)),
            (Self::String(left), Self::String(right)) => Some(left.cmp(right)),
            (Self::Boolean(left), Self::Boolean(right)) => Some(left.cmp(right)),
            (Self::Date(left), Self::Date(right)) => Some(left.cmp(right)),
            (Self::Enum(left), Self::Enum(right)) => Some(left.cmp(right)),
            _ => None,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Self::Number(value) => value.normalize().to_string(),
            Self::String(value) => value.clone(),
            Self::Boolean(value) => value.to_string(),
            Self::Date(value) => value.format(DATE_FORMAT).to_string(),
            Self::Enum(value) => value.to_string(),
            Self::Object(entries) => {
                let fields = entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value.to_text()))
                    .collect::<Vec<_>>();
                format!("{{{}}}", fields.join(", "))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => write!(f, "\"{}\"", value),
            other => write!(f, "{}", other.to_text()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(value) => {
                let normalized = value.normalize();
                if normalized.scale() == 0 {
                    if let Some(integer) = normalized.to_i64() {
                        return serializer.serialize_i64(integer);
                    }
                }
                serializer.serialize_f64(normalized.to_f64().unwrap_or_default())
            }
            Self::String(value) => serializer.serialize_str(value),
            Self::Boolean(value) => serializer.serialize_bool(*value),
            Self::Date(value) => serializer.serialize_str(&value.format(DATE_FORMAT).to_string()),
            Self::Enum(value) => serializer.serialize_str(&value.to_string()),
            Self::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::Date(value)
    }
}

impl From<EnumValue> for Value {
    fn from(value: EnumValue) -> Self {
        Self::Enum(value)
    }
}

pub fn default_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

pub fn default_primitive_value(primitive: PrimitiveType) -> Value {
    match primitive {
        PrimitiveType::Number => Value::Number(Decimal::ZERO),
        PrimitiveType::String => Value::String(String::new()),
        PrimitiveType::Boolean => Value::Boolean(false),
        PrimitiveType::Date => Value::Date(default_date()),
    }
}

/// Accepts `2024-01-31`, `2024-01-31T10:20:30` and `2024-01-31 10:20:30`.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(value) = NaiveDateTime::parse_from_str(text, DATE_FORMAT) {
        return Some(value);
    }
    if let Ok(value) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(value);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod value_tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn numbers_compare_as_decimals() {
        let left = Value::Number(Decimal::from_str("1.50").expect("decimal"));
        let right = Value::Number(Decimal::from_str("1.5").expect("decimal"));
        assert_eq!(left, right);
        assert_eq!(left.compare(&Value::from(2)), Some(Ordering::Less));
        assert_eq!(left.compare(&Value::from("1.5")), None);
    }

    #[test]
    fn default_values_follow_primitive_types() {
        assert_eq!(
            default_primitive_value(PrimitiveType::Number),
            Value::Number(Decimal::ZERO)
        );
        assert_eq!(
            default_primitive_value(PrimitiveType::Date).to_text(),
            "0001-01-01T00:00:00"
        );
    }

    #[test]
    fn parse_date_supports_date_and_date_time() {
        assert_eq!(
            parse_date("2024-02-29").map(|value| value.format(DATE_FORMAT).to_string()),
            Some("2024-02-29T00:00:00".to_string())
        );
        assert!(parse_date("2024-01-31T10:20:30").is_some());
        assert!(parse_date("2024-13-01").is_none());
    }

    #[test]
    fn serialize_renders_enums_as_tags_and_integers_as_numbers() {
        let mut entries = BTreeMap::new();
        entries.insert("Color".to_string(), Value::Enum(EnumValue::new("Color", "Red")));
        entries.insert("Count".to_string(), Value::from(777));
        let json = serde_json::to_string(&Value::Object(entries)).expect("serialize");
        assert_eq!(json, r#"{"Color":"Color.Red","Count":777}"#);
    }

    #[test]
    fn get_path_walks_nested_objects() {
        let mut inner = BTreeMap::new();
        inner.insert("First".to_string(), Value::from(777));
        let mut outer = BTreeMap::new();
        outer.insert("Inner".to_string(), Value::Object(inner));
        let value = Value::Object(outer);
        assert_eq!(
            value.get_path(&VariablePath::parse("Inner.First")),
            Some(&Value::from(777))
        );
        assert!(value.get_path(&VariablePath::parse("Inner.Second")).is_none());
    }

    #[test]
    fn enum_tags_parse_into_enum_values() {
        assert_eq!(
            EnumValue::parse_tag("Color.Red"),
            Some(EnumValue::new("Color", "Red"))
        );
        assert!(EnumValue::parse_tag("Red").is_none());
    }
}
