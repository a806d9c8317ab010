use crate::model::attribute::{AttributeValue, Decimal};
use crate::utils::formatting::{english_enumerate, OR};
use crate::utils::JsonPointer;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The declared type of an attribute value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Any,
    Bool,
    Int,
    Float,
    String,
    Bytes,
    Decimal,
    DateTime,
    Date,
    Array(Box<AttributeType>),
    /// An array whose items must be unique
    Set(Box<AttributeType>),
    /// An object whose values share the same type
    Object(Box<AttributeType>),
    Nullable(Box<AttributeType>),
    /// Resolved by the custom converter registered under this name
    Custom(String),
}

impl AttributeType {
    pub fn array_of(ty: AttributeType) -> Self { AttributeType::Array(Box::new(ty)) }

    pub fn set_of(ty: AttributeType) -> Self { AttributeType::Set(Box::new(ty)) }

    pub fn object_of(ty: AttributeType) -> Self { AttributeType::Object(Box::new(ty)) }

    pub fn nullable(self) -> Self {
        match self {
            AttributeType::Nullable(_) | AttributeType::Any => self,
            ty => AttributeType::Nullable(Box::new(ty)),
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, AttributeType::Nullable(_) | AttributeType::Any)
    }

    /// Human readable name of the type, in terms of JSON types
    pub fn type_repr(&self) -> String {
        match self {
            AttributeType::Any => "any value".into(),
            AttributeType::Bool => "boolean".into(),
            AttributeType::Int | AttributeType::Float => "number".into(),
            AttributeType::String | AttributeType::Bytes | AttributeType::Date => "string".into(),
            AttributeType::Decimal | AttributeType::DateTime => "number or string".into(),
            AttributeType::Array(ty) | AttributeType::Set(ty) => {
                format!("array of {}", ty.type_repr())
            },
            AttributeType::Object(ty) => format!("object of {{string: {}}}", ty.type_repr()),
            AttributeType::Nullable(ty) => {
                format!("any of {}", english_enumerate(vec![ty.type_repr(), "null".into()], OR))
            },
            AttributeType::Custom(name) => name.clone(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.type_repr()) }
}

/// Name of the JSON type of `value`
pub fn json_type_repr(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A single problem found in an incoming document
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ValidationError {
    pub pointer: JsonPointer,
    pub message: String,
}

impl ValidationError {
    pub fn new(pointer: JsonPointer, message: impl Into<String>) -> Self {
        Self { pointer, message: message.into() }
    }

    pub fn type_mismatch(pointer: JsonPointer, value: &Value, expected: &str) -> Self {
        Self::new(
            pointer,
            format!(
                "value has type {} ({}) where {} expected",
                json_type_repr(value),
                value,
                expected
            ),
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.pointer)
    }
}

impl std::error::Error for ValidationError {}

/// Receives the validation errors found during a conversion
pub trait ConverterContext {
    /// Whether the conversion should stop as early as possible
    fn stopped(&self) -> bool;

    fn validation_error_occurred(&mut self, error: ValidationError);

    fn errors(&self) -> &[ValidationError];

    fn take_errors(&mut self) -> Vec<ValidationError>;
}

/// Stops at the first validation error
#[derive(Debug, Default)]
pub struct DefaultConverterContext {
    error: Option<ValidationError>,
}

impl ConverterContext for DefaultConverterContext {
    fn stopped(&self) -> bool { self.error.is_some() }

    fn validation_error_occurred(&mut self, error: ValidationError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn errors(&self) -> &[ValidationError] { self.error.as_ref().map(std::slice::from_ref).unwrap_or(&[]) }

    fn take_errors(&mut self) -> Vec<ValidationError> { self.error.take().into_iter().collect() }
}

/// Keeps converting after a validation error and collects all of them
#[derive(Debug, Default)]
pub struct ErrorCollectingConverterContext {
    errors: Vec<ValidationError>,
}

impl ConverterContext for ErrorCollectingConverterContext {
    fn stopped(&self) -> bool { false }

    fn validation_error_occurred(&mut self, error: ValidationError) { self.errors.push(error); }

    fn errors(&self) -> &[ValidationError] { &self.errors }

    fn take_errors(&mut self) -> Vec<ValidationError> { std::mem::take(&mut self.errors) }
}

/// Conversion for `AttributeType::Custom` types
pub trait CustomConverter: Send + Sync {
    fn resolve_name(&self) -> String;

    /// Returns `None` after reporting the problem to `ctx` when `value` cannot be converted
    fn convert(
        &self, converter: &TypedValueConverter, ctx: &mut dyn ConverterContext, pointer: &JsonPointer,
        value: &Value,
    ) -> Option<AttributeValue>;
}

/// Converts plain JSON values into typed [`AttributeValue`]s
#[derive(Clone, Default)]
pub struct TypedValueConverter {
    custom_types: HashMap<String, Arc<dyn CustomConverter>>,
}

impl fmt::Debug for TypedValueConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedValueConverter")
            .field("custom_types", &self.custom_types.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TypedValueConverter {
    pub fn new() -> Self { Default::default() }

    pub fn register(&mut self, name: impl Into<String>, converter: Arc<dyn CustomConverter>) {
        self.custom_types.insert(name.into(), converter);
    }

    pub fn type_repr(&self, ty: &AttributeType) -> String {
        match ty {
            AttributeType::Custom(name) => match self.custom_types.get(name) {
                Some(custom) => custom.resolve_name(),
                None => format!("unknown type: {}", name),
            },
            ty => ty.type_repr(),
        }
    }

    /// Converts `value` into a value of type `ty`.
    ///
    /// Problems are reported to `ctx` together with the location `pointer`, in which case
    /// `None` is returned.
    pub fn convert(
        &self, ctx: &mut dyn ConverterContext, pointer: &JsonPointer, ty: &AttributeType,
        value: &Value,
    ) -> Option<AttributeValue> {
        let converted = match (ty, value) {
            (AttributeType::Any, value) => Some(value.clone().into()),
            (AttributeType::Nullable(_), Value::Null) => Some(AttributeValue::Null),
            (AttributeType::Nullable(inner), value) => self.convert(ctx, pointer, inner, value),
            (AttributeType::Custom(name), value) => match self.custom_types.get(name) {
                Some(custom) => custom.convert(self, ctx, pointer, value),
                None => {
                    ctx.validation_error_occurred(ValidationError::new(
                        pointer.clone(),
                        format!("unknown type: {}", name),
                    ));
                    None
                },
            },
            (AttributeType::Bool, Value::Bool(b)) => Some(AttributeValue::Bool(*b)),
            (AttributeType::Int, Value::Number(n)) => {
                match n.as_i64().or_else(|| n.as_f64().and_then(exact_i64)) {
                    Some(i) => Some(AttributeValue::Int(i)),
                    None => self.fail(ctx, pointer, format!("bad integer ({})", value)),
                }
            },
            (AttributeType::Float, Value::Number(n)) => n.as_f64().map(AttributeValue::Float),
            (AttributeType::String, Value::String(s)) => Some(AttributeValue::String(s.clone())),
            (AttributeType::Bytes, Value::String(s)) => match base64::decode(s) {
                Ok(bytes) => Some(AttributeValue::Bytes(bytes)),
                Err(_) => self.fail(ctx, pointer, format!("bad base64 string ({})", value)),
            },
            (AttributeType::Decimal, Value::String(s)) => match s.parse::<Decimal>() {
                Ok(d) => Some(AttributeValue::Decimal(d)),
                Err(_) => self.fail(ctx, pointer, format!("bad decimal string ({})", value)),
            },
            (AttributeType::Decimal, Value::Number(n)) => match n.to_string().parse::<Decimal>() {
                Ok(d) => Some(AttributeValue::Decimal(d)),
                Err(_) => self.fail(ctx, pointer, format!("bad decimal string ({})", value)),
            },
            (AttributeType::DateTime, Value::String(s)) => match parse_date_time(s) {
                Some(dt) => Some(AttributeValue::DateTime(dt)),
                None => self.fail(ctx, pointer, format!("bad date time string ({})", value)),
            },
            (AttributeType::DateTime, Value::Number(n)) => {
                match n.as_f64().and_then(date_time_from_timestamp) {
                    Some(dt) => Some(AttributeValue::DateTime(dt)),
                    None => self.fail(ctx, pointer, format!("bad timestamp ({})", value)),
                }
            },
            (AttributeType::Date, Value::String(s)) => match parse_date(s) {
                Some(d) => Some(AttributeValue::Date(d)),
                None => self.fail(ctx, pointer, format!("bad date time string ({})", value)),
            },
            (AttributeType::Array(item_ty), Value::Array(items)) => {
                self.convert_array(ctx, pointer, item_ty, items)
            },
            (AttributeType::Set(item_ty), Value::Array(items)) => {
                self.convert_set(ctx, pointer, item_ty, items)
            },
            (AttributeType::Object(value_ty), Value::Object(map)) => {
                let mut converted = IndexMap::with_capacity(map.len());
                let mut failed = false;
                for (k, v) in map {
                    match self.convert(ctx, &pointer.join(k), value_ty, v) {
                        Some(v) => {
                            converted.insert(k.clone(), v);
                        },
                        None => failed = true,
                    }
                    if ctx.stopped() {
                        break;
                    }
                }
                if failed {
                    None
                } else {
                    Some(AttributeValue::Object(converted))
                }
            },
            (ty, value) => {
                ctx.validation_error_occurred(ValidationError::type_mismatch(
                    pointer.clone(),
                    value,
                    &self.type_repr(ty),
                ));
                None
            },
        };
        log::trace!("converted {} as {}: {}", pointer, ty, converted.is_some());
        converted
    }

    fn convert_array(
        &self, ctx: &mut dyn ConverterContext, pointer: &JsonPointer, item_ty: &AttributeType,
        items: &[Value],
    ) -> Option<AttributeValue> {
        let mut converted = Vec::with_capacity(items.len());
        let mut failed = false;
        for (i, item) in items.iter().enumerate() {
            match self.convert(ctx, &pointer.index(i), item_ty, item) {
                Some(v) => converted.push(v),
                None => failed = true,
            }
            if ctx.stopped() {
                break;
            }
        }
        if failed {
            None
        } else {
            Some(AttributeValue::Array(converted))
        }
    }

    fn convert_set(
        &self, ctx: &mut dyn ConverterContext, pointer: &JsonPointer, item_ty: &AttributeType,
        items: &[Value],
    ) -> Option<AttributeValue> {
        let mut converted: Vec<AttributeValue> = Vec::with_capacity(items.len());
        let mut occurred_at: Vec<usize> = Vec::with_capacity(items.len());
        let mut failed = false;
        for (i, item) in items.iter().enumerate() {
            let item_pointer = pointer.index(i);
            match self.convert(ctx, &item_pointer, item_ty, item) {
                Some(v) => match converted.iter().position(|c| c == &v) {
                    Some(pos) => {
                        failed = true;
                        ctx.validation_error_occurred(ValidationError::new(
                            item_pointer,
                            format!(
                                "identical item {} already occurred at index {}",
                                item, occurred_at[pos]
                            ),
                        ));
                    },
                    None => {
                        converted.push(v);
                        occurred_at.push(i);
                    },
                },
                None => failed = true,
            }
            if ctx.stopped() {
                break;
            }
        }
        if failed {
            None
        } else {
            Some(AttributeValue::Array(converted))
        }
    }

    fn fail(
        &self, ctx: &mut dyn ConverterContext, pointer: &JsonPointer, message: String,
    ) -> Option<AttributeValue> {
        ctx.validation_error_occurred(ValidationError::new(pointer.clone(), message));
        None
    }
}

fn utc(naive: &NaiveDateTime) -> DateTime<FixedOffset> { Utc.from_utc_datetime(naive).into() }

/// Parses an ISO 8601 date-time; strings without an offset and bare dates are taken as UTC
pub fn parse_date_time(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    for fmt in &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(utc(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| utc(&naive))
}

/// Parses the date portion of an ISO 8601 date or date-time
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_date_time(s).map(|dt| dt.naive_local().date()))
}

/// Seconds since the UNIX epoch, in UTC
pub fn date_time_from_timestamp(timestamp: f64) -> Option<DateTime<FixedOffset>> {
    if !timestamp.is_finite() {
        return None;
    }
    let secs = timestamp.floor();
    let nanos = (((timestamp - secs) * 1e9).round() as u32).min(999_999_999);
    Utc.timestamp_opt(secs as i64, nanos).single().map(Into::into)
}

/// `f` as an `i64` if it is integral and in range; `as` would saturate instead
fn exact_i64(f: f64) -> Option<i64> {
    // i64::MIN is -2^63 exactly, i64::MAX rounds up to 2^63
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    if f.fract() == 0.0 && f >= -BOUND && f < BOUND {
        Some(f as i64)
    } else {
        None
    }
}
