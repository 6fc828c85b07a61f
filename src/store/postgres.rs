//! PostgreSQL implementations of the store ports.

use crate::case::to_camel_case;
use crate::error::AppError;
use crate::features::ReadQuery;
use crate::model::{
    add_derived_fields, year_bounds, ColumnKind, DeveloperPatch, DeveloperRecord, EntitySchema, LevelStats,
    MonthlyPlan, UserPatch, UserRecord, DEVELOPER_SCHEMA, PLAN_MAX_GROUPS, STATS_MIN_RATING, USER_SCHEMA,
};
use crate::sql::{self, bind_all, FieldValue, QueryBuf};
use crate::store::{DeveloperStore, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row};
use uuid::Uuid;

type Document = Map<String, Value>;

async fn fetch_all(pool: &PgPool, schema: &EntitySchema, q: &QueryBuf) -> Result<Vec<Document>, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let rows = bind_all(sqlx::query(&q.sql), &q.params).fetch_all(pool).await?;
    rows.iter().map(|r| row_to_document(r, schema)).collect()
}

async fn fetch_optional(pool: &PgPool, schema: &EntitySchema, q: &QueryBuf) -> Result<Option<Document>, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let row = bind_all(sqlx::query(&q.sql), &q.params).fetch_optional(pool).await?;
    row.map(|r| row_to_document(&r, schema)).transpose()
}

async fn execute(pool: &PgPool, q: &QueryBuf) -> Result<u64, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let result = bind_all(sqlx::query(&q.sql), &q.params).execute(pool).await?;
    Ok(result.rows_affected())
}

/// Decode a row by the schema's column kinds; keys become API field names.
fn row_to_document(row: &PgRow, schema: &EntitySchema) -> Result<Document, AppError> {
    let mut doc = Map::new();
    for col in row.columns() {
        let name = col.name();
        let kind = column_kind(schema, name)?;
        let value = cell_to_field(row, name, kind)?;
        doc.insert(to_camel_case(name), value.to_json());
    }
    Ok(doc)
}

fn cell_to_field(row: &PgRow, name: &str, kind: ColumnKind) -> Result<FieldValue, sqlx::Error> {
    Ok(match kind {
        ColumnKind::Uuid => row
            .try_get::<Option<Uuid>, _>(name)?
            .map(FieldValue::Uuid)
            .unwrap_or(FieldValue::Null),
        ColumnKind::Text => row.try_get::<Option<String>, _>(name)?.into(),
        ColumnKind::Float => row.try_get::<Option<f64>, _>(name)?.into(),
        ColumnKind::Int => row
            .try_get::<Option<i32>, _>(name)?
            .map(|n| FieldValue::Int(n.into()))
            .unwrap_or(FieldValue::Null),
        ColumnKind::Bool => row
            .try_get::<Option<bool>, _>(name)?
            .map(FieldValue::Bool)
            .unwrap_or(FieldValue::Null),
        ColumnKind::Timestamp => row
            .try_get::<Option<DateTime<Utc>>, _>(name)?
            .map(FieldValue::Timestamp)
            .unwrap_or(FieldValue::Null),
        ColumnKind::TextArray => FieldValue::TextList(row.try_get::<Option<Vec<String>>, _>(name)?.unwrap_or_default()),
        ColumnKind::TimestampArray => {
            FieldValue::TimestampList(row.try_get::<Option<Vec<DateTime<Utc>>>, _>(name)?.unwrap_or_default())
        }
    })
}

/// Per-level aggregates over visible developers rated at least `$1`.
fn stats_sql() -> String {
    format!(
        r#"
        SELECT UPPER(experience_level),
               COUNT(*),
               COALESCE(SUM(ratings_quantity), 0)::int8,
               AVG(ratings_average),
               AVG(hourly_rate),
               MIN(hourly_rate),
               MAX(hourly_rate)
        FROM developers
        WHERE {} AND ratings_average >= $1
        GROUP BY UPPER(experience_level)
        ORDER BY AVG(hourly_rate) ASC
        "#,
        DEVELOPER_SCHEMA.visibility.unwrap_or("TRUE")
    )
}

/// Start dates in `[$1, $2)` grouped by calendar month.
fn monthly_plan_sql() -> String {
    format!(
        r#"
        SELECT EXTRACT(MONTH FROM start_date AT TIME ZONE 'UTC')::int4 AS month,
               COUNT(*),
               ARRAY_AGG(name)
        FROM developers, UNNEST(start_dates) AS start_date
        WHERE {} AND start_date >= $1 AND start_date < $2
        GROUP BY month
        ORDER BY month
        LIMIT {}
        "#,
        DEVELOPER_SCHEMA.visibility.unwrap_or("TRUE"),
        PLAN_MAX_GROUPS
    )
}

fn column_kind(schema: &EntitySchema, name: &str) -> Result<ColumnKind, AppError> {
    schema
        .columns
        .iter()
        .find(|c| c.column() == name)
        .map(|c| c.kind)
        .ok_or_else(|| AppError::Internal(format!("unexpected column {} from {}", name, schema.table)))
}

fn developer(mut doc: Document) -> Value {
    add_derived_fields(&mut doc);
    Value::Object(doc)
}

#[derive(Clone)]
pub struct PgDeveloperStore {
    pool: PgPool,
}

impl PgDeveloperStore {
    pub fn new(pool: PgPool) -> Self {
        PgDeveloperStore { pool }
    }
}

#[async_trait]
impl DeveloperStore for PgDeveloperStore {
    async fn list(&self, query: &ReadQuery<'_>) -> Result<Vec<Value>, AppError> {
        let q = sql::select_list(query);
        let docs = fetch_all(&self.pool, &DEVELOPER_SCHEMA, &q).await?;
        Ok(docs.into_iter().map(developer).collect())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Value>, AppError> {
        let q = sql::select_by_id(&DEVELOPER_SCHEMA, id);
        Ok(fetch_optional(&self.pool, &DEVELOPER_SCHEMA, &q).await?.map(developer))
    }

    async fn create(&self, record: &DeveloperRecord) -> Result<Value, AppError> {
        let q = sql::insert(&DEVELOPER_SCHEMA, &record.fields())?;
        let doc = fetch_optional(&self.pool, &DEVELOPER_SCHEMA, &q)
            .await?
            .ok_or_else(|| AppError::Internal("insert returned no row".into()))?;
        Ok(developer(doc))
    }

    async fn update(&self, id: Uuid, patch: &DeveloperPatch) -> Result<Option<Value>, AppError> {
        let q = sql::update(&DEVELOPER_SCHEMA, id, &patch.fields())?;
        Ok(fetch_optional(&self.pool, &DEVELOPER_SCHEMA, &q).await?.map(developer))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let q = sql::delete(&DEVELOPER_SCHEMA, id);
        Ok(execute(&self.pool, &q).await? > 0)
    }

    async fn stats(&self) -> Result<Vec<LevelStats>, AppError> {
        let stmt = stats_sql();
        tracing::debug!(sql = %stmt, "query");
        let rows: Vec<(String, i64, i64, f64, f64, f64, f64)> = sqlx::query_as(&stmt)
            .bind(STATS_MIN_RATING)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(
                |(level, num_developers, num_ratings, avg_rating, avg_price, min_price, max_price)| LevelStats {
                    level,
                    num_developers,
                    num_ratings,
                    avg_rating,
                    avg_price,
                    min_price,
                    max_price,
                },
            )
            .collect())
    }

    async fn monthly_plan(&self, year: i32) -> Result<Vec<MonthlyPlan>, AppError> {
        let (start, end) = year_bounds(year).ok_or_else(|| AppError::cast("year", "number", year.to_string()))?;
        let stmt = monthly_plan_sql();
        tracing::debug!(sql = %stmt, year, "query");
        let rows: Vec<(i32, i64, Vec<String>)> = sqlx::query_as(&stmt)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(month, num_developer_starts, developers)| MonthlyPlan {
                month,
                num_developer_starts,
                developers,
            })
            .collect())
    }

    async fn insert_many(&self, records: &[DeveloperRecord]) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut count = 0u64;
        for record in records {
            let q = sql::insert(&DEVELOPER_SCHEMA, &record.fields())?;
            tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
            bind_all(sqlx::query(&q.sql), &q.params).execute(&mut *tx).await?;
            count += 1;
        }
        tx.commit().await?;
        Ok(count)
    }

    async fn delete_all(&self) -> Result<u64, AppError> {
        execute(&self.pool, &sql::delete_all(&DEVELOPER_SCHEMA)).await
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        PgUserStore { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list(&self, query: &ReadQuery<'_>) -> Result<Vec<Value>, AppError> {
        let q = sql::select_list(query);
        let docs = fetch_all(&self.pool, &USER_SCHEMA, &q).await?;
        Ok(docs.into_iter().map(Value::Object).collect())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Value>, AppError> {
        let q = sql::select_by_id(&USER_SCHEMA, id);
        Ok(fetch_optional(&self.pool, &USER_SCHEMA, &q).await?.map(Value::Object))
    }

    async fn create(&self, record: &UserRecord, password_hash: &str) -> Result<Value, AppError> {
        let q = sql::insert(&USER_SCHEMA, &record.fields(password_hash))?;
        let doc = fetch_optional(&self.pool, &USER_SCHEMA, &q)
            .await?
            .ok_or_else(|| AppError::Internal("insert returned no row".into()))?;
        Ok(Value::Object(doc))
    }

    async fn find_with_password(&self, email: &str) -> Result<Option<(Value, String)>, AppError> {
        let q = sql::select_by_field_with(&USER_SCHEMA, "email", &FieldValue::Text(email.to_string()), &["password"])?;
        let Some(mut doc) = fetch_optional(&self.pool, &USER_SCHEMA, &q).await? else {
            return Ok(None);
        };
        let hash = match doc.remove("password") {
            Some(Value::String(hash)) => hash,
            _ => return Err(AppError::Internal("user row without password hash".into())),
        };
        Ok(Some((Value::Object(doc), hash)))
    }

    async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<Option<Value>, AppError> {
        let q = sql::update(&USER_SCHEMA, id, &patch.fields())?;
        Ok(fetch_optional(&self.pool, &USER_SCHEMA, &q).await?.map(Value::Object))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let q = sql::delete(&USER_SCHEMA, id);
        Ok(execute(&self.pool, &q).await? > 0)
    }
}
