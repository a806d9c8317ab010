use crate::error::JsonApiSerdeError;
use crate::utils::AttributeType;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Number, Value};
use std::collections::{HashMap, HashSet};
use std::convert::TryFrom;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

lazy_static! {
    static ref DECIMAL_REGEX: Regex =
        Regex::new(r#"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$"#).unwrap();
}

/// Ordered attribute map of a resource
pub type Attributes = IndexMap<String, AttributeValue>;

/// An exact decimal number, kept in the textual form it was given in
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Decimal(String);

impl Decimal {
    pub fn as_str(&self) -> &str { &self.0 }

    /// Nearest `f64`; used when decimals are rendered as JSON numbers
    pub fn to_f64(&self) -> Option<f64> { self.0.parse().ok().filter(|f: &f64| f.is_finite()) }
}

impl FromStr for Decimal {
    type Err = JsonApiSerdeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if DECIMAL_REGEX.is_match(s) {
            Ok(Decimal(s.to_owned()))
        } else {
            Err(JsonApiSerdeError::InvalidDecimal(s.to_owned()))
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Binary attribute value, exchanged as a base64 string
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct Bytes(pub Vec<u8>);

/// A typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Decimal(Decimal),
    DateTime(DateTime<FixedOffset>),
    /// A date-time without timezone; needs an assumed offset to be rendered
    NaiveDateTime(NaiveDateTime),
    Date(NaiveDate),
    Array(Vec<AttributeValue>),
    Object(IndexMap<String, AttributeValue>),
}

impl Default for AttributeValue {
    fn default() -> Self { AttributeValue::Null }
}

impl AttributeValue {
    pub fn is_null(&self) -> bool { matches!(self, AttributeValue::Null) }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Plain JSON form of the value.
    ///
    /// Typed scalars become strings (date-times in RFC 3339, bytes in base64) and non-finite
    /// floats become `null`. Use [`crate::renderer::ReprRenderer`] for option-aware rendering.
    pub fn to_json(&self) -> Value {
        match self {
            AttributeValue::Null => Value::Null,
            AttributeValue::Bool(b) => Value::Bool(*b),
            AttributeValue::Int(i) => Value::Number((*i).into()),
            AttributeValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            AttributeValue::String(s) => Value::String(s.clone()),
            AttributeValue::Bytes(b) => Value::String(base64::encode(b)),
            AttributeValue::Decimal(d) => Value::String(d.to_string()),
            AttributeValue::DateTime(dt) => {
                Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))
            },
            AttributeValue::NaiveDateTime(dt) => {
                Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            },
            AttributeValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            AttributeValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            AttributeValue::Object(map) => {
                Value::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            },
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.to_json()) }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Int(i),
                None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => AttributeValue::String(s),
            Value::Array(items) => AttributeValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                AttributeValue::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            },
        }
    }
}

macro_rules! attribute_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for AttributeValue {
                fn from(value: $ty) -> Self { AttributeValue::$variant(value.into()) }
            }
        )*
    };
}

attribute_value_from!(
    bool => Bool,
    i32 => Int,
    i64 => Int,
    f64 => Float,
    String => String,
    &str => String,
    Decimal => Decimal,
    DateTime<FixedOffset> => DateTime,
    DateTime<Utc> => DateTime,
    NaiveDateTime => NaiveDateTime,
    NaiveDate => Date,
    Bytes => Bytes,
    Vec<AttributeValue> => Array,
);

impl From<Bytes> for Vec<u8> {
    fn from(bytes: Bytes) -> Self { bytes.0 }
}

/// A Rust type usable as an attribute of an entity
pub trait AttributeField: Sized {
    /// The type incoming values are converted to
    fn attribute_type() -> AttributeType;

    fn allow_null() -> bool { false }

    fn to_attribute_value(&self) -> AttributeValue;

    /// Returns the problem as a short description when `value` does not fit
    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String>;
}

fn unexpected<T>(expected: &AttributeType, value: &AttributeValue) -> Result<T, String> {
    Err(format!("{} expected, got {}", expected, value))
}

macro_rules! integer_attribute_field {
    ($($ty:ty),*) => {
        $(
            impl AttributeField for $ty {
                fn attribute_type() -> AttributeType { AttributeType::Int }

                fn to_attribute_value(&self) -> AttributeValue {
                    match i64::try_from(*self) {
                        Ok(i) => AttributeValue::Int(i),
                        Err(_) => AttributeValue::Float(*self as f64),
                    }
                }

                fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
                    match value {
                        AttributeValue::Int(i) => <$ty>::try_from(*i)
                            .map_err(|_| format!("{} is out of range for {}", i, stringify!($ty))),
                        value => unexpected(&Self::attribute_type(), value),
                    }
                }
            }
        )*
    };
}

integer_attribute_field!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! float_attribute_field {
    ($($ty:ty),*) => {
        $(
            impl AttributeField for $ty {
                fn attribute_type() -> AttributeType { AttributeType::Float }

                fn to_attribute_value(&self) -> AttributeValue { AttributeValue::Float(*self as f64) }

                fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
                    match value {
                        AttributeValue::Float(f) => Ok(*f as $ty),
                        AttributeValue::Int(i) => Ok(*i as $ty),
                        value => unexpected(&Self::attribute_type(), value),
                    }
                }
            }
        )*
    };
}

float_attribute_field!(f32, f64);

impl AttributeField for bool {
    fn attribute_type() -> AttributeType { AttributeType::Bool }

    fn to_attribute_value(&self) -> AttributeValue { AttributeValue::Bool(*self) }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
        match value {
            AttributeValue::Bool(b) => Ok(*b),
            value => unexpected(&Self::attribute_type(), value),
        }
    }
}

impl AttributeField for String {
    fn attribute_type() -> AttributeType { AttributeType::String }

    fn to_attribute_value(&self) -> AttributeValue { AttributeValue::String(self.clone()) }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
        match value {
            AttributeValue::String(s) => Ok(s.clone()),
            value => unexpected(&Self::attribute_type(), value),
        }
    }
}

impl AttributeField for Decimal {
    fn attribute_type() -> AttributeType { AttributeType::Decimal }

    fn to_attribute_value(&self) -> AttributeValue { AttributeValue::Decimal(self.clone()) }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
        match value {
            AttributeValue::Decimal(d) => Ok(d.clone()),
            AttributeValue::Int(i) => Ok(Decimal(i.to_string())),
            value => unexpected(&Self::attribute_type(), value),
        }
    }
}

impl AttributeField for Bytes {
    fn attribute_type() -> AttributeType { AttributeType::Bytes }

    fn to_attribute_value(&self) -> AttributeValue { AttributeValue::Bytes(self.0.clone()) }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
        match value {
            AttributeValue::Bytes(b) => Ok(Bytes(b.clone())),
            value => unexpected(&Self::attribute_type(), value),
        }
    }
}

impl AttributeField for DateTime<FixedOffset> {
    fn attribute_type() -> AttributeType { AttributeType::DateTime }

    fn to_attribute_value(&self) -> AttributeValue { AttributeValue::DateTime(*self) }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
        match value {
            AttributeValue::DateTime(dt) => Ok(*dt),
            value => unexpected(&Self::attribute_type(), value),
        }
    }
}

impl AttributeField for DateTime<Utc> {
    fn attribute_type() -> AttributeType { AttributeType::DateTime }

    fn to_attribute_value(&self) -> AttributeValue { AttributeValue::DateTime((*self).into()) }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
        match value {
            AttributeValue::DateTime(dt) => Ok(dt.with_timezone(&Utc)),
            value => unexpected(&Self::attribute_type(), value),
        }
    }
}

impl AttributeField for NaiveDateTime {
    fn attribute_type() -> AttributeType { AttributeType::DateTime }

    fn to_attribute_value(&self) -> AttributeValue { AttributeValue::NaiveDateTime(*self) }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
        match value {
            AttributeValue::NaiveDateTime(dt) => Ok(*dt),
            AttributeValue::DateTime(dt) => Ok(dt.naive_utc()),
            value => unexpected(&Self::attribute_type(), value),
        }
    }
}

impl AttributeField for NaiveDate {
    fn attribute_type() -> AttributeType { AttributeType::Date }

    fn to_attribute_value(&self) -> AttributeValue { AttributeValue::Date(*self) }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
        match value {
            AttributeValue::Date(d) => Ok(*d),
            AttributeValue::DateTime(dt) => Ok(dt.naive_local().date()),
            value => unexpected(&Self::attribute_type(), value),
        }
    }
}

impl AttributeField for Value {
    fn attribute_type() -> AttributeType { AttributeType::Any }

    fn allow_null() -> bool { true }

    fn to_attribute_value(&self) -> AttributeValue { self.clone().into() }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> { Ok(value.to_json()) }
}

impl AttributeField for AttributeValue {
    fn attribute_type() -> AttributeType { AttributeType::Any }

    fn allow_null() -> bool { true }

    fn to_attribute_value(&self) -> AttributeValue { self.clone() }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> { Ok(value.clone()) }
}

impl<T: AttributeField> AttributeField for Option<T> {
    fn attribute_type() -> AttributeType { T::attribute_type().nullable() }

    fn allow_null() -> bool { true }

    fn to_attribute_value(&self) -> AttributeValue {
        match self {
            Some(v) => v.to_attribute_value(),
            None => AttributeValue::Null,
        }
    }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
        match value {
            AttributeValue::Null => Ok(None),
            value => T::from_attribute_value(value).map(Some),
        }
    }
}

impl<T: AttributeField> AttributeField for Vec<T> {
    fn attribute_type() -> AttributeType { AttributeType::array_of(T::attribute_type()) }

    fn to_attribute_value(&self) -> AttributeValue {
        AttributeValue::Array(self.iter().map(T::to_attribute_value).collect())
    }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
        match value {
            AttributeValue::Array(items) => items.iter().map(T::from_attribute_value).collect(),
            value => unexpected(&Self::attribute_type(), value),
        }
    }
}

impl<T: AttributeField + Eq + Hash> AttributeField for HashSet<T> {
    fn attribute_type() -> AttributeType { AttributeType::set_of(T::attribute_type()) }

    fn to_attribute_value(&self) -> AttributeValue {
        AttributeValue::Array(self.iter().map(T::to_attribute_value).collect())
    }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
        match value {
            AttributeValue::Array(items) => items.iter().map(T::from_attribute_value).collect(),
            value => unexpected(&Self::attribute_type(), value),
        }
    }
}

impl<T: AttributeField> AttributeField for IndexMap<String, T> {
    fn attribute_type() -> AttributeType { AttributeType::object_of(T::attribute_type()) }

    fn to_attribute_value(&self) -> AttributeValue {
        AttributeValue::Object(self.iter().map(|(k, v)| (k.clone(), v.to_attribute_value())).collect())
    }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
        match value {
            AttributeValue::Object(map) => map
                .iter()
                .map(|(k, v)| T::from_attribute_value(v).map(|v| (k.clone(), v)))
                .collect(),
            value => unexpected(&Self::attribute_type(), value),
        }
    }
}

impl<T: AttributeField> AttributeField for HashMap<String, T> {
    fn attribute_type() -> AttributeType { AttributeType::object_of(T::attribute_type()) }

    fn to_attribute_value(&self) -> AttributeValue {
        let mut keys: Vec<&String> = self.keys().collect();
        keys.sort();
        AttributeValue::Object(
            keys.into_iter().map(|k| (k.clone(), self[k].to_attribute_value())).collect(),
        )
    }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
        match value {
            AttributeValue::Object(map) => map
                .iter()
                .map(|(k, v)| T::from_attribute_value(v).map(|v| (k.clone(), v)))
                .collect(),
            value => unexpected(&Self::attribute_type(), value),
        }
    }
}
