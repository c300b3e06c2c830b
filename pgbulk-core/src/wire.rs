//! Wire types and values
//!
//! `WireType` is the closed set of PostgreSQL types a column can be tagged
//! with during binary transfer. `Value` is one field of one row, produced by
//! an entity and consumed by the COPY encoder or a bound SQL parameter.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Protocol-level type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// `text` / `varchar`
    Text,
    /// `int4`
    Integer,
    /// `int8`
    BigInt,
    /// `bool`
    Boolean,
    /// `timestamp` (without time zone)
    Timestamp,
    /// `float8`
    Double,
}

impl WireType {
    /// PostgreSQL type name, usable in casts.
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Double => "double precision",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// A single field value of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i32),
    BigInt(i64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    Double(f64),
}

impl Value {
    /// Wire type carried by this value, `None` for NULL.
    pub fn wire_type(&self) -> Option<WireType> {
        match self {
            Self::Null => None,
            Self::Text(_) => Some(WireType::Text),
            Self::Integer(_) => Some(WireType::Integer),
            Self::BigInt(_) => Some(WireType::BigInt),
            Self::Boolean(_) => Some(WireType::Boolean),
            Self::Timestamp(_) => Some(WireType::Timestamp),
            Self::Double(_) => Some(WireType::Double),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Text(s) => write!(f, "'{}'", s),
            Self::Integer(n) => write!(f, "{}", n),
            Self::BigInt(n) => write!(f, "{}", n),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Timestamp(ts) => write!(f, "{}", ts),
            Self::Double(d) => write!(f, "{}", d),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::BigInt(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value.naive_utc())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}
