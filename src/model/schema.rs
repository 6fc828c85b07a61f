//! Static column descriptors: the only source of identifiers that reach SQL.

use crate::case::to_snake_case;

/// Column storage kind; drives SQL casts, query-string parsing and row decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Uuid,
    Text,
    Float,
    Int,
    Bool,
    Timestamp,
    TextArray,
    TimestampArray,
}

impl ColumnKind {
    /// PostgreSQL type name used in `$n::type` casts.
    pub fn pg_type(self) -> &'static str {
        match self {
            ColumnKind::Uuid => "uuid",
            ColumnKind::Text => "text",
            ColumnKind::Float => "float8",
            ColumnKind::Int => "int4",
            ColumnKind::Bool => "bool",
            ColumnKind::Timestamp => "timestamptz",
            ColumnKind::TextArray => "text[]",
            ColumnKind::TimestampArray => "timestamptz[]",
        }
    }

    /// Name used in cast error messages.
    pub fn label(self) -> &'static str {
        match self {
            ColumnKind::Uuid => "uuid",
            ColumnKind::Text | ColumnKind::TextArray => "string",
            ColumnKind::Float | ColumnKind::Int => "number",
            ColumnKind::Bool => "boolean",
            ColumnKind::Timestamp | ColumnKind::TimestampArray => "date",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    /// API (camelCase) field name.
    pub field: &'static str,
    pub kind: ColumnKind,
    /// Hidden columns are never projected, filtered or sorted on.
    pub hidden: bool,
}

impl ColumnDef {
    pub const fn new(field: &'static str, kind: ColumnKind) -> Self {
        ColumnDef {
            field,
            kind,
            hidden: false,
        }
    }

    pub const fn hidden(self) -> Self {
        ColumnDef { hidden: true, ..self }
    }

    /// snake_case column name.
    pub fn column(&self) -> String {
        to_snake_case(self.field)
    }
}

#[derive(Debug)]
pub struct EntitySchema {
    pub table: &'static str,
    /// Primary key first. The internal `version` column is not listed.
    pub columns: &'static [ColumnDef],
    /// SQL predicate applied to every default read, if any.
    pub visibility: Option<&'static str>,
    /// Field sorted descending when the request names no sort.
    pub default_sort: Option<&'static str>,
}

impl EntitySchema {
    pub const ID: &'static str = "id";

    /// Look up a non-hidden field by its API name.
    pub fn field(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.field == name && !c.hidden)
    }

    /// Look up any field, hidden ones included. For writes and credential reads.
    pub fn any_field(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.field == name)
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| !c.hidden)
    }
}
