//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from an entity schema.

use crate::error::AppError;
use crate::features::{Filter, ReadQuery};
use crate::model::schema::{ColumnDef, ColumnKind, EntitySchema};
use crate::sql::params::{BindValue, FieldValue};
use uuid::Uuid;

/// Quote identifier for PostgreSQL (safe: only from static schemas).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: &FieldValue) -> u32 {
        self.params.push(v.to_bind());
        self.params.len() as u32
    }

    /// Push a value and return its placeholder with a cast to the column type.
    fn placeholder(&mut self, v: &FieldValue, kind: ColumnKind) -> String {
        let n = self.push_param(v);
        format!("${}::{}", n, kind.pg_type())
    }
}

fn column_list<'c>(columns: impl IntoIterator<Item = &'c ColumnDef>) -> String {
    columns
        .into_iter()
        .map(|c| quoted(&c.column()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn visible_column_list(schema: &EntitySchema) -> String {
    column_list(schema.visible_columns())
}

fn render_filter(q: &mut QueryBuf, f: &Filter<'_>) -> String {
    let col = quoted(&f.column.column());
    match f.column.kind {
        ColumnKind::TextArray | ColumnKind::TimestampArray => {
            // element op value  ⇔  value flipped(op) ANY(array)
            let elem = if f.column.kind == ColumnKind::TextArray {
                ColumnKind::Text
            } else {
                ColumnKind::Timestamp
            };
            let ph = q.placeholder(&f.value, elem);
            format!("{} {} ANY({})", ph, f.op.flipped().sql_op(), col)
        }
        kind => {
            let ph = q.placeholder(&f.value, kind);
            format!("{} {} {}", col, f.op.sql_op(), ph)
        }
    }
}

/// WHERE clause with the visibility predicate first, then `extra` conditions.
fn where_clause(schema: &EntitySchema, extra: Vec<String>) -> String {
    let mut parts: Vec<String> = schema.visibility.map(String::from).into_iter().collect();
    parts.extend(extra);
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

fn id_condition(q: &mut QueryBuf, id: Uuid) -> String {
    let ph = q.placeholder(&FieldValue::Uuid(id), ColumnKind::Uuid);
    format!("{} = {}", quoted(EntitySchema::ID), ph)
}

/// SELECT for a list read: projection, filters, sort, LIMIT/OFFSET.
pub fn select_list(query: &ReadQuery<'_>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let schema = query.schema;
    let conditions: Vec<String> = query.filters.iter().map(|f| render_filter(&mut q, f)).collect();
    let where_sql = where_clause(schema, conditions);
    let order_sql = if query.sort.is_empty() {
        String::new()
    } else {
        let keys: Vec<String> = query
            .sort
            .iter()
            .map(|k| format!("{} {}", quoted(&k.column.column()), k.direction.sql()))
            .collect();
        format!(" ORDER BY {}", keys.join(", "))
    };
    q.sql = format!(
        "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
        column_list(query.projection.iter().copied()),
        quoted(schema.table),
        where_sql,
        order_sql,
        query.limit,
        query.skip()
    );
    q
}

/// SELECT one visible row by id.
pub fn select_by_id(schema: &EntitySchema, id: Uuid) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cond = id_condition(&mut q, id);
    q.sql = format!(
        "SELECT {} FROM {}{}",
        visible_column_list(schema),
        quoted(schema.table),
        where_clause(schema, vec![cond])
    );
    q
}

/// SELECT by a field equal to `value`, adding the named hidden fields to the projection.
pub fn select_by_field_with(
    schema: &EntitySchema,
    field: &str,
    value: &FieldValue,
    include_hidden: &[&str],
) -> Result<QueryBuf, AppError> {
    let column = schema
        .any_field(field)
        .ok_or_else(|| AppError::Internal(format!("unknown field {} on {}", field, schema.table)))?;
    let mut q = QueryBuf::new();
    let ph = q.placeholder(value, column.kind);
    let cond = format!("{} = {}", quoted(&column.column()), ph);
    let cols = column_list(
        schema
            .columns
            .iter()
            .filter(|c| !c.hidden || include_hidden.contains(&c.field)),
    );
    q.sql = format!(
        "SELECT {} FROM {}{} LIMIT 1",
        cols,
        quoted(schema.table),
        where_clause(schema, vec![cond])
    );
    Ok(q)
}

fn resolve<'s>(schema: &'s EntitySchema, field: &str) -> Result<&'s ColumnDef, AppError> {
    schema
        .any_field(field)
        .ok_or_else(|| AppError::Internal(format!("unknown field {} on {}", field, schema.table)))
}

/// INSERT one row, RETURNING the visible columns.
pub fn insert(schema: &EntitySchema, fields: &[(&str, FieldValue)]) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let mut cols = Vec::with_capacity(fields.len());
    let mut placeholders = Vec::with_capacity(fields.len());
    for (field, value) in fields {
        let column = resolve(schema, field)?;
        cols.push(quoted(&column.column()));
        placeholders.push(q.placeholder(value, column.kind));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(schema.table),
        cols.join(", "),
        placeholders.join(", "),
        visible_column_list(schema)
    );
    Ok(q)
}

/// UPDATE a visible row by id: SET only the given fields and bump the revision.
pub fn update(schema: &EntitySchema, id: Uuid, fields: &[(&str, FieldValue)]) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::with_capacity(fields.len() + 1);
    for (field, value) in fields {
        let column = resolve(schema, field)?;
        let ph = q.placeholder(value, column.kind);
        sets.push(format!("{} = {}", quoted(&column.column()), ph));
    }
    sets.push(format!("{0} = {0} + 1", quoted("version")));
    let cond = id_condition(&mut q, id);
    q.sql = format!(
        "UPDATE {} SET {}{} RETURNING {}",
        quoted(schema.table),
        sets.join(", "),
        where_clause(schema, vec![cond]),
        visible_column_list(schema)
    );
    Ok(q)
}

/// DELETE a visible row by id, RETURNING its id.
pub fn delete(schema: &EntitySchema, id: Uuid) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cond = id_condition(&mut q, id);
    q.sql = format!(
        "DELETE FROM {}{} RETURNING {}",
        quoted(schema.table),
        where_clause(schema, vec![cond]),
        quoted(EntitySchema::ID)
    );
    q
}

/// DELETE every row, hidden ones included.
pub fn delete_all(schema: &EntitySchema) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("DELETE FROM {}", quoted(schema.table));
    q
}
