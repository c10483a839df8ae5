use crate::error::{ConfigError, RecordError};
use chrono::{DateTime, Utc};
use std::hash::{Hash, Hasher};

/// Time unit used to render a record's timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Precision {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    #[default]
    Seconds,
    Minutes,
    Hours,
}

impl Precision {
    /// The token used for the `precision` query parameter.
    pub fn as_query_value(&self) -> &'static str {
        match self {
            Precision::Nanoseconds => "n",
            Precision::Microseconds => "u",
            Precision::Milliseconds => "ms",
            Precision::Seconds => "s",
            Precision::Minutes => "m",
            Precision::Hours => "h",
        }
    }

    fn nanos_per_unit(&self) -> i128 {
        match self {
            Precision::Nanoseconds => 1,
            Precision::Microseconds => 1_000,
            Precision::Milliseconds => 1_000_000,
            Precision::Seconds => 1_000_000_000,
            Precision::Minutes => 60_000_000_000,
            Precision::Hours => 3_600_000_000_000,
        }
    }

    /// Number of whole units between the Unix epoch and `timestamp`.
    pub fn timestamp_value(&self, timestamp: &DateTime<Utc>) -> i128 {
        let nanos = i128::from(timestamp.timestamp()) * 1_000_000_000
            + i128::from(timestamp.timestamp_subsec_nanos());
        nanos.div_euclid(self.nanos_per_unit())
    }
}

impl std::str::FromStr for Precision {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "n" | "ns" => Ok(Precision::Nanoseconds),
            "u" | "us" => Ok(Precision::Microseconds),
            "ms" => Ok(Precision::Milliseconds),
            "s" => Ok(Precision::Seconds),
            "m" => Ok(Precision::Minutes),
            "h" => Ok(Precision::Hours),
            _ => Err(ConfigError::InvalidPrecision(value.to_string())),
        }
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_query_value())
    }
}

/// A tag key/value pair. Equal tags hash alike because only the key is hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    key: String,
    value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, RecordError> {
        let key = key.into();
        let value = value.into();
        if key.trim().is_empty() {
            return Err(RecordError::EmptyTagKey);
        }
        if value.trim().is_empty() {
            return Err(RecordError::EmptyTagValue(key));
        }
        Ok(Tag { key, value })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FieldValue::Boolean(v) => v.fmt(f),
            FieldValue::Integer(v) => v.fmt(f),
            FieldValue::Float(v) => v.fmt(f),
            FieldValue::String(v) => v.fmt(f),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

/// A field key/value pair. Non-finite floats are rejected so every field has
/// a literal the database accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    key: String,
    value: FieldValue,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<FieldValue>) -> Result<Self, RecordError> {
        let key = key.into();
        let value = value.into();
        if key.trim().is_empty() {
            return Err(RecordError::EmptyFieldKey);
        }
        match &value {
            FieldValue::String(v) if v.trim().is_empty() => {
                return Err(RecordError::EmptyFieldValue(key))
            }
            FieldValue::Float(v) if !v.is_finite() => {
                return Err(RecordError::NonFiniteValue { key, value: *v })
            }
            _ => (),
        }
        Ok(Field { key, value })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }
}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// One time-series point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub name: String,
    pub tags: Vec<Tag>,
    pub fields: Vec<Field>,
    pub timestamp: Option<DateTime<Utc>>,
    pub precision: Precision,
}

impl Record {
    pub fn new(
        name: impl Into<String>,
        tags: Vec<Tag>,
        fields: Vec<Field>,
        timestamp: Option<DateTime<Utc>>,
        precision: Precision,
    ) -> Self {
        Record {
            name: name.into(),
            tags,
            fields,
            timestamp,
            precision,
        }
    }

    pub fn to_line_protocol(&self) -> String {
        crate::line_protocol::encode_record(self)
    }
}

/// Records flushed together, in the order they were written.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch(Vec<Record>);

impl Batch {
    pub fn new() -> Self {
        Batch(Vec::new())
    }

    pub fn records(&self) -> &[Record] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.0
    }

    pub fn to_line_protocol(&self) -> String {
        crate::line_protocol::encode_batch(&self.0)
    }
}

impl From<Vec<Record>> for Batch {
    fn from(records: Vec<Record>) -> Self {
        Batch(records)
    }
}

impl From<&[Record]> for Batch {
    fn from(records: &[Record]) -> Self {
        Batch(records.to_vec())
    }
}

impl FromIterator<Record> for Batch {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Batch(iter.into_iter().collect())
    }
}
