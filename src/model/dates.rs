//! Date parsing for start dates and date-valued query filters.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d,%H:%M", "%Y-%m-%d %H:%M"];

/// Accepts RFC 3339, a few naive date-time layouts (read as UTC) and bare `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_all<E: serde::de::Error>(raw: Vec<String>) -> Result<Vec<DateTime<Utc>>, E> {
    raw.iter()
        .map(|s| parse_date(s).ok_or_else(|| E::custom(format!("invalid date '{}'", s))))
        .collect()
}

pub fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    parse_all(raw)
}

pub fn deserialize_optional_list<'de, D>(deserializer: D) -> Result<Option<Vec<DateTime<Utc>>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Vec<String>>::deserialize(deserializer)? {
        Some(raw) => parse_all(raw).map(Some),
        None => Ok(None),
    }
}
