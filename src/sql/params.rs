//! Typed field values and their conversion to sqlx bind parameters.
//!
//! Scalars are bound as text and converted by an explicit `$n::type` cast in the
//! statement, so one bind type covers every column kind.

use crate::model::dates::parse_date;
use crate::model::schema::ColumnKind;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Uuid(Uuid),
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    TextList(Vec<String>),
    TimestampList(Vec<DateTime<Utc>>),
}

impl FieldValue {
    /// Parse a query-string value for a column of `kind`. Array columns take a
    /// single element (filters match when any element matches).
    pub fn parse(kind: ColumnKind, raw: &str) -> Option<Self> {
        match kind {
            ColumnKind::Uuid => Uuid::parse_str(raw.trim()).ok().map(FieldValue::Uuid),
            ColumnKind::Text | ColumnKind::TextArray => Some(FieldValue::Text(raw.to_string())),
            ColumnKind::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(FieldValue::Float),
            // Int columns are int4; wider values cannot be cast.
            ColumnKind::Int => raw.trim().parse::<i32>().ok().map(|n| FieldValue::Int(n.into())),
            ColumnKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(FieldValue::Bool(true)),
                "false" | "0" => Some(FieldValue::Bool(false)),
                _ => None,
            },
            ColumnKind::Timestamp | ColumnKind::TimestampArray => parse_date(raw).map(FieldValue::Timestamp),
        }
    }

    /// JSON form as returned to clients.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Uuid(u) => Value::String(u.to_string()),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            FieldValue::Int(n) => Value::Number((*n).into()),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Timestamp(d) => Value::String(format_timestamp(d)),
            FieldValue::TextList(v) => Value::Array(v.iter().cloned().map(Value::String).collect()),
            FieldValue::TimestampList(v) => Value::Array(v.iter().map(|d| Value::String(format_timestamp(d))).collect()),
        }
    }

    pub fn to_bind(&self) -> BindValue {
        match self {
            FieldValue::Null => BindValue::Text(None),
            FieldValue::Uuid(u) => BindValue::Text(Some(u.to_string())),
            FieldValue::Text(s) => BindValue::Text(Some(s.clone())),
            FieldValue::Float(f) => BindValue::Text(Some(f.to_string())),
            FieldValue::Int(n) => BindValue::Text(Some(n.to_string())),
            FieldValue::Bool(b) => BindValue::Text(Some(b.to_string())),
            FieldValue::Timestamp(d) => BindValue::Text(Some(format_timestamp(d))),
            FieldValue::TextList(v) => BindValue::TextArray(v.clone()),
            FieldValue::TimestampList(v) => BindValue::TextArray(v.iter().map(format_timestamp).collect()),
        }
    }
}

impl From<Option<String>> for FieldValue {
    fn from(v: Option<String>) -> Self {
        v.map(FieldValue::Text).unwrap_or(FieldValue::Null)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(v: Option<f64>) -> Self {
        v.map(FieldValue::Float).unwrap_or(FieldValue::Null)
    }
}

pub fn format_timestamp(d: &DateTime<Utc>) -> String {
    d.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A value as it is handed to sqlx.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Text(Option<String>),
    TextArray(Vec<String>),
}

/// Bind every parameter in order.
pub fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[BindValue],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = match p {
            BindValue::Text(s) => query.bind(s.clone()),
            BindValue::TextArray(v) => query.bind(v.clone()),
        };
    }
    query
}
