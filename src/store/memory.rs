//! In-memory store ports for router and handler tests. Mirrors the PostgreSQL
//! semantics the handlers rely on: visibility, unique keys, query features.

use crate::error::AppError;
use crate::features::{Comparison, Direction, ReadQuery};
use crate::model::dates::parse_date;
use crate::model::{
    add_derived_fields, year_bounds, DeveloperPatch, DeveloperRecord, LevelStats, MonthlyPlan, UserPatch, UserRecord,
    PLAN_MAX_GROUPS, STATS_MIN_RATING,
};
use crate::sql::{format_timestamp, FieldValue};
use crate::store::{DeveloperStore, UserStore};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Mutex;
use uuid::Uuid;

type Document = Map<String, Value>;

fn lock<T>(m: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, AppError> {
    m.lock().map_err(|_| AppError::Internal("memory store lock poisoned".into()))
}

fn duplicate(table: &str, column: &str, value: &str) -> AppError {
    AppError::DuplicateKey {
        raw: format!(
            "duplicate key value violates unique constraint \"{}_{}_key\" Key ({})=({}) already exists.",
            table, column, column, value
        ),
    }
}

fn apply_fields(doc: &mut Document, fields: &[(&str, FieldValue)]) {
    for (field, value) in fields {
        doc.insert((*field).to_string(), value.to_json());
    }
}

fn id_of(doc: &Document) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

/// Order a stored JSON value against a typed filter value.
fn compare(stored: &Value, wanted: &FieldValue) -> Option<Ordering> {
    match wanted {
        FieldValue::Float(f) => stored.as_f64()?.partial_cmp(f),
        FieldValue::Int(n) => stored.as_f64()?.partial_cmp(&(*n as f64)),
        FieldValue::Text(s) => Some(stored.as_str()?.cmp(s.as_str())),
        FieldValue::Uuid(u) => Some(stored.as_str()?.cmp(u.to_string().as_str())),
        FieldValue::Bool(b) => Some(stored.as_bool()?.cmp(b)),
        FieldValue::Timestamp(d) => Some(parse_date(stored.as_str()?)?.cmp(d)),
        _ => None,
    }
}

fn holds(ordering: Ordering, op: Comparison) -> bool {
    match op {
        Comparison::Eq => ordering == Ordering::Equal,
        Comparison::Gt => ordering == Ordering::Greater,
        Comparison::Gte => ordering != Ordering::Less,
        Comparison::Lt => ordering == Ordering::Less,
        Comparison::Lte => ordering != Ordering::Greater,
    }
}

fn matches(doc: &Document, query: &ReadQuery<'_>) -> bool {
    query.filters.iter().all(|f| match doc.get(f.column.field) {
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| compare(item, &f.value).is_some_and(|o| holds(o, f.op))),
        Some(value) => compare(value, &f.value).is_some_and(|o| holds(o, f.op)),
        None => false,
    })
}

fn order_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Evaluate a composed read over `docs`.
fn run_query<'d>(docs: impl Iterator<Item = &'d Document>, query: &ReadQuery<'_>) -> Vec<Document> {
    let mut found: Vec<&Document> = docs.filter(|d| matches(d, query)).collect();
    found.sort_by(|a, b| {
        query
            .sort
            .iter()
            .map(|k| {
                let o = order_values(a.get(k.column.field), b.get(k.column.field));
                match k.direction {
                    Direction::Asc => o,
                    Direction::Desc => o.reverse(),
                }
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    found
        .into_iter()
        .skip(query.skip() as usize)
        .take(query.limit as usize)
        .map(|d| {
            query
                .projection
                .iter()
                .filter_map(|c| d.get(c.field).map(|v| (c.field.to_string(), v.clone())))
                .collect()
        })
        .collect()
}

fn number(doc: &Document, field: &str) -> f64 {
    doc.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

fn is_visible(doc: &Document) -> bool {
    doc.get("secret").and_then(Value::as_bool) != Some(true)
}

fn developer(mut doc: Document) -> Value {
    add_derived_fields(&mut doc);
    Value::Object(doc)
}

#[derive(Default)]
pub struct MemoryDeveloperStore {
    docs: Mutex<Vec<Document>>,
}

impl MemoryDeveloperStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_locked(docs: &mut Vec<Document>, record: &DeveloperRecord) -> Result<Document, AppError> {
        if docs.iter().any(|d| d.get("name").and_then(Value::as_str) == Some(record.name.as_str())) {
            return Err(duplicate("developers", "name", &record.name));
        }
        let mut doc = Map::new();
        doc.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        apply_fields(&mut doc, &record.fields());
        doc.insert("createdAt".into(), Value::String(format_timestamp(&Utc::now())));
        docs.push(doc.clone());
        Ok(doc)
    }
}

#[async_trait]
impl DeveloperStore for MemoryDeveloperStore {
    async fn list(&self, query: &ReadQuery<'_>) -> Result<Vec<Value>, AppError> {
        let docs = lock(&self.docs)?;
        Ok(run_query(docs.iter().filter(|d| is_visible(d)), query)
            .into_iter()
            .map(developer)
            .collect())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Value>, AppError> {
        let id = id.to_string();
        let docs = lock(&self.docs)?;
        Ok(docs
            .iter()
            .find(|d| is_visible(d) && id_of(d) == Some(id.as_str()))
            .cloned()
            .map(developer))
    }

    async fn create(&self, record: &DeveloperRecord) -> Result<Value, AppError> {
        let mut docs = lock(&self.docs)?;
        Self::insert_locked(&mut docs, record).map(developer)
    }

    async fn update(&self, id: Uuid, patch: &DeveloperPatch) -> Result<Option<Value>, AppError> {
        let id = id.to_string();
        let mut docs = lock(&self.docs)?;
        if let Some(name) = &patch.name {
            let taken = docs
                .iter()
                .any(|d| id_of(d) != Some(id.as_str()) && d.get("name").and_then(Value::as_str) == Some(name.as_str()));
            if taken {
                return Err(duplicate("developers", "name", name));
            }
        }
        let Some(doc) = docs
            .iter_mut()
            .find(|d| is_visible(d) && id_of(d) == Some(id.as_str()))
        else {
            return Ok(None);
        };
        apply_fields(doc, &patch.fields());
        Ok(Some(developer(doc.clone())))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let id = id.to_string();
        let mut docs = lock(&self.docs)?;
        let before = docs.len();
        docs.retain(|d| !(is_visible(d) && id_of(d) == Some(id.as_str())));
        Ok(docs.len() < before)
    }

    async fn stats(&self) -> Result<Vec<LevelStats>, AppError> {
        let docs = lock(&self.docs)?;
        let mut groups: BTreeMap<String, Vec<&Document>> = BTreeMap::new();
        for doc in docs.iter().filter(|d| is_visible(d)) {
            let rating = doc.get("ratingsAverage").and_then(Value::as_f64).unwrap_or(0.0);
            if rating < STATS_MIN_RATING {
                continue;
            }
            let level = doc
                .get("experienceLevel")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_uppercase();
            groups.entry(level).or_default().push(doc);
        }
        let mut stats: Vec<LevelStats> = groups
            .into_iter()
            .map(|(level, members)| {
                let n = members.len() as f64;
                let prices: Vec<f64> = members.iter().map(|d| number(d, "hourlyRate")).collect();
                LevelStats {
                    level,
                    num_developers: members.len() as i64,
                    num_ratings: members.iter().map(|d| number(d, "ratingsQuantity") as i64).sum(),
                    avg_rating: members.iter().map(|d| number(d, "ratingsAverage")).sum::<f64>() / n,
                    avg_price: prices.iter().sum::<f64>() / n,
                    min_price: prices.iter().copied().fold(f64::INFINITY, f64::min),
                    max_price: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                }
            })
            .collect();
        stats.sort_by(|a, b| a.avg_price.partial_cmp(&b.avg_price).unwrap_or(Ordering::Equal));
        Ok(stats)
    }

    async fn monthly_plan(&self, year: i32) -> Result<Vec<MonthlyPlan>, AppError> {
        let (start, end) = year_bounds(year).ok_or_else(|| AppError::cast("year", "number", year.to_string()))?;
        let docs = lock(&self.docs)?;
        let mut months: BTreeMap<i32, Vec<String>> = BTreeMap::new();
        for doc in docs.iter().filter(|d| is_visible(d)) {
            let name = doc.get("name").and_then(Value::as_str).unwrap_or_default();
            let dates = doc.get("startDates").and_then(Value::as_array).cloned().unwrap_or_default();
            for date in dates.iter().filter_map(Value::as_str).filter_map(parse_date) {
                if date >= start && date < end {
                    months.entry(date.month() as i32).or_default().push(name.to_string());
                }
            }
        }
        Ok(months
            .into_iter()
            .take(PLAN_MAX_GROUPS as usize)
            .map(|(month, developers)| MonthlyPlan {
                month,
                num_developer_starts: developers.len() as i64,
                developers,
            })
            .collect())
    }

    async fn insert_many(&self, records: &[DeveloperRecord]) -> Result<u64, AppError> {
        let mut docs = lock(&self.docs)?;
        let mut staged = docs.clone();
        for record in records {
            Self::insert_locked(&mut staged, record)?;
        }
        *docs = staged;
        Ok(records.len() as u64)
    }

    async fn delete_all(&self) -> Result<u64, AppError> {
        let mut docs = lock(&self.docs)?;
        let n = docs.len() as u64;
        docs.clear();
        Ok(n)
    }
}

struct StoredUser {
    doc: Document,
    password_hash: String,
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<StoredUser>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self, query: &ReadQuery<'_>) -> Result<Vec<Value>, AppError> {
        let users = lock(&self.users)?;
        Ok(run_query(users.iter().map(|u| &u.doc), query)
            .into_iter()
            .map(Value::Object)
            .collect())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Value>, AppError> {
        let id = id.to_string();
        let users = lock(&self.users)?;
        Ok(users
            .iter()
            .find(|u| id_of(&u.doc) == Some(id.as_str()))
            .map(|u| Value::Object(u.doc.clone())))
    }

    async fn create(&self, record: &UserRecord, password_hash: &str) -> Result<Value, AppError> {
        let mut users = lock(&self.users)?;
        if users
            .iter()
            .any(|u| u.doc.get("email").and_then(Value::as_str) == Some(record.email.as_str()))
        {
            return Err(duplicate("users", "email", &record.email));
        }
        let mut doc = Map::new();
        doc.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        let fields: Vec<_> = record
            .fields(password_hash)
            .into_iter()
            .filter(|(f, _)| *f != "password")
            .collect();
        apply_fields(&mut doc, &fields);
        users.push(StoredUser {
            doc: doc.clone(),
            password_hash: password_hash.to_string(),
        });
        Ok(Value::Object(doc))
    }

    async fn find_with_password(&self, email: &str) -> Result<Option<(Value, String)>, AppError> {
        let users = lock(&self.users)?;
        Ok(users
            .iter()
            .find(|u| u.doc.get("email").and_then(Value::as_str) == Some(email))
            .map(|u| (Value::Object(u.doc.clone()), u.password_hash.clone())))
    }

    async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<Option<Value>, AppError> {
        let id = id.to_string();
        let mut users = lock(&self.users)?;
        if let Some(email) = &patch.email {
            let taken = users.iter().any(|u| {
                id_of(&u.doc) != Some(id.as_str()) && u.doc.get("email").and_then(Value::as_str) == Some(email.as_str())
            });
            if taken {
                return Err(duplicate("users", "email", email));
            }
        }
        let Some(user) = users.iter_mut().find(|u| id_of(&u.doc) == Some(id.as_str())) else {
            return Ok(None);
        };
        apply_fields(&mut user.doc, &patch.fields());
        Ok(Some(Value::Object(user.doc.clone())))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let id = id.to_string();
        let mut users = lock(&self.users)?;
        let before = users.len();
        users.retain(|u| id_of(&u.doc) != Some(id.as_str()));
        Ok(users.len() < before)
    }
}
