//! Model instance serialization
//!
//! Audit records store the field values of the model a request touched.
//! Field types the sink cannot store directly are normalized: dates and
//! times become datetimes, decimals become floats, byte strings become
//! text and file fields become their stored name.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Reference to a stored file, as held by a file field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    /// Storage-relative name of the file
    pub name: String,
}

impl FileRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A single field value as read from a model instance
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Decimal(Decimal),
    File(FileRef),
    Json(Value),
}

/// A field value the audit sink can store
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SerializedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
    Json(Value),
}

/// Anything that can present its fields as a name to value mapping
pub trait ModelInstance {
    fn to_field_map(&self) -> BTreeMap<String, FieldValue>;
}

impl ModelInstance for BTreeMap<String, FieldValue> {
    fn to_field_map(&self) -> BTreeMap<String, FieldValue> {
        self.clone()
    }
}

/// Serialize every field of `instance`
pub fn serialize_model_instance<M>(instance: &M) -> BTreeMap<String, SerializedValue>
where
    M: ModelInstance + ?Sized,
{
    instance
        .to_field_map()
        .into_iter()
        .map(|(name, value)| (name, serialize_value(value)))
        .collect()
}

/// Normalize one field value
pub fn serialize_value(value: FieldValue) -> SerializedValue {
    match value {
        FieldValue::Null => SerializedValue::Null,
        FieldValue::Bool(b) => SerializedValue::Bool(b),
        FieldValue::Int(i) => SerializedValue::Int(i),
        FieldValue::Float(f) => SerializedValue::Float(f),
        FieldValue::Text(s) => SerializedValue::Text(s),
        FieldValue::Bytes(bytes) => {
            SerializedValue::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        FieldValue::Date(date) => SerializedValue::DateTime(date.and_time(NaiveTime::MIN)),
        FieldValue::Time(time) => SerializedValue::DateTime(time_anchor().and_time(time)),
        FieldValue::DateTime(dt) => SerializedValue::DateTime(dt),
        FieldValue::Decimal(d) => SerializedValue::Float(d.to_f64().unwrap_or(f64::NAN)),
        FieldValue::File(file) => SerializedValue::Text(file.name),
        FieldValue::Json(v) => SerializedValue::Json(v),
    }
}

/// Date a bare time of day is placed on: 0001-01-01
fn time_anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}
