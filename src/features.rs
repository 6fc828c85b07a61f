//! Query features: turns list-endpoint query parameters into a [`ReadQuery`].
//!
//! Steps run in order: filter, sort, field projection, pagination.
//!
//! ```text
//! ?experienceLevel=Expert&hourlyRate[gte]=50&sort=-ratingsAverage,hourlyRate&fields=name,hourlyRate&page=2&limit=10
//! ```

use crate::error::AppError;
use crate::model::schema::{ColumnDef, EntitySchema};
use crate::sql::FieldValue;
use regex::Regex;
use std::sync::OnceLock;

/// Keys that steer the query and never become filters.
pub const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "$gt" => Some(Comparison::Gt),
            "$gte" => Some(Comparison::Gte),
            "$lt" => Some(Comparison::Lt),
            "$lte" => Some(Comparison::Lte),
            _ => None,
        }
    }

    pub fn sql_op(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
        }
    }

    /// Same relation with the operands swapped (`a < b` ⇔ `b > a`).
    pub fn flipped(self) -> Self {
        match self {
            Comparison::Eq => Comparison::Eq,
            Comparison::Gt => Comparison::Lt,
            Comparison::Gte => Comparison::Lte,
            Comparison::Lt => Comparison::Gt,
            Comparison::Lte => Comparison::Gte,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filter<'a> {
    pub column: &'a ColumnDef,
    pub op: Comparison,
    pub value: FieldValue,
}

#[derive(Clone, Copy, Debug)]
pub struct SortKey<'a> {
    pub column: &'a ColumnDef,
    pub direction: Direction,
}

/// A composed read: what to match, in which order, which fields, which page.
#[derive(Clone, Debug)]
pub struct ReadQuery<'a> {
    pub schema: &'a EntitySchema,
    pub filters: Vec<Filter<'a>>,
    pub sort: Vec<SortKey<'a>>,
    pub projection: Vec<&'a ColumnDef>,
    pub page: u32,
    pub limit: u32,
}

impl<'a> ReadQuery<'a> {
    /// Every visible document: no filters, default sort, all fields, first page.
    pub fn all(schema: &'a EntitySchema) -> Self {
        QueryFeatures::new(schema, &[])
            .sort()
            .limit_fields()
            .paginate()
            .build()
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Chainable builder over the raw query parameters.
pub struct QueryFeatures<'a, 'p> {
    params: &'p [(String, String)],
    query: ReadQuery<'a>,
}

impl<'a, 'p> QueryFeatures<'a, 'p> {
    pub fn new(schema: &'a EntitySchema, params: &'p [(String, String)]) -> Self {
        QueryFeatures {
            params,
            query: ReadQuery {
                schema,
                filters: Vec::new(),
                sort: Vec::new(),
                projection: schema.visible_columns().collect(),
                page: DEFAULT_PAGE,
                limit: DEFAULT_LIMIT,
            },
        }
    }

    /// Run all four steps.
    pub fn apply(schema: &'a EntitySchema, params: &'p [(String, String)]) -> Result<ReadQuery<'a>, AppError> {
        Ok(Self::new(schema, params)
            .filter()?
            .sort()
            .limit_fields()
            .paginate()
            .build())
    }

    fn param(&self, key: &str) -> Option<&'p str> {
        self.params
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Non-reserved keys become filters. `field[gte]`-style keys are rewritten
    /// to marker form (`field[$gte]`) and parsed as comparisons.
    pub fn filter(mut self) -> Result<Self, AppError> {
        let schema = self.query.schema;
        for (key, raw) in self.params {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let rewritten = rewrite_operators(key);
            let (field, op) = parse_filter_key(&rewritten)?;
            let Some(column) = schema.field(field) else {
                tracing::debug!(field, "ignoring filter on unknown field");
                continue;
            };
            let value = FieldValue::parse(column.kind, raw)
                .ok_or_else(|| AppError::cast(column.field, column.kind.label(), raw.as_str()))?;
            self.query.filters.push(Filter { column, op, value });
        }
        Ok(self)
    }

    /// `sort=a,-b`: ascending `a`, then descending `b`. Defaults to the schema's
    /// default sort field, descending.
    pub fn sort(mut self) -> Self {
        let schema = self.query.schema;
        let mut keys = Vec::new();
        if let Some(raw) = self.param("sort") {
            for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let (name, direction) = match part.strip_prefix('-') {
                    Some(name) => (name, Direction::Desc),
                    None => (part, Direction::Asc),
                };
                if let Some(column) = schema.field(name) {
                    keys.push(SortKey { column, direction });
                }
            }
        }
        if keys.is_empty() {
            if let Some(column) = schema.default_sort.and_then(|f| schema.field(f)) {
                keys.push(SortKey {
                    column,
                    direction: Direction::Desc,
                });
            }
        }
        self.query.sort = keys;
        self
    }

    /// `fields=a,b` keeps `id`, `a` and `b`; `fields=-a,-b` keeps everything but
    /// `a` and `b`. The internal version column is never part of the schema.
    pub fn limit_fields(mut self) -> Self {
        let schema = self.query.schema;
        let Some(raw) = self.param("fields") else {
            return self;
        };
        let parts: Vec<&str> = raw.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            return self;
        }
        if parts.iter().all(|p| p.starts_with('-')) {
            let excluded: Vec<&str> = parts.iter().map(|p| p.trim_start_matches('-')).collect();
            self.query.projection = schema
                .visible_columns()
                .filter(|c| c.field == EntitySchema::ID || !excluded.contains(&c.field))
                .collect();
            return self;
        }
        let mut projection: Vec<&ColumnDef> = schema.field(EntitySchema::ID).into_iter().collect();
        for part in parts.iter().filter(|p| !p.starts_with('-')) {
            if let Some(column) = schema.field(part) {
                if !projection.iter().any(|c| c.field == column.field) {
                    projection.push(column);
                }
            }
        }
        self.query.projection = projection;
        self
    }

    /// `page` and `limit` must be positive integers; anything else falls back
    /// to the defaults. `limit` is capped at [`MAX_LIMIT`].
    pub fn paginate(mut self) -> Self {
        self.query.page = positive(self.param("page")).unwrap_or(DEFAULT_PAGE);
        self.query.limit = positive(self.param("limit")).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        self
    }

    pub fn build(self) -> ReadQuery<'a> {
        self.query
    }
}

fn positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse::<u32>().ok()).filter(|n| *n > 0)
}

/// Prefix bare comparison words inside brackets with `$`: `price[gte]` → `price[$gte]`.
pub fn rewrite_operators(key: &str) -> String {
    static OPERATORS: OnceLock<Regex> = OnceLock::new();
    let re = OPERATORS.get_or_init(|| Regex::new(r"\[(gte|gt|lte|lt)\]").expect("valid regex"));
    re.replace_all(key, "[$$$1]").into_owned()
}

/// Split `field` or `field[$op]`.
fn parse_filter_key(key: &str) -> Result<(&str, Comparison), AppError> {
    let Some((field, rest)) = key.split_once('[') else {
        return Ok((key, Comparison::Eq));
    };
    let marker = rest.strip_suffix(']').unwrap_or(rest);
    let op = Comparison::from_marker(marker).ok_or_else(|| {
        AppError::bad_request(format!(
            "Unsupported filter operator '{}' on {}",
            marker.trim_start_matches('$'),
            field
        ))
    })?;
    Ok((field, op))
}
