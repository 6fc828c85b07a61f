//! Persistence ports. Handlers talk to these traits; `postgres` implements them
//! on a `PgPool`.
//!
//! Documents are JSON objects keyed by API (camelCase) field names. Developer
//! documents carry the derived `durationWeeks`. Secret developers are invisible
//! to every method except `delete_all`.

mod ddl;
#[cfg(test)]
pub mod memory;
mod postgres;

pub use ddl::{ensure_database_exists, ensure_tables};
pub use postgres::{PgDeveloperStore, PgUserStore};

use crate::error::AppError;
use crate::features::ReadQuery;
use crate::model::{DeveloperPatch, DeveloperRecord, LevelStats, MonthlyPlan, UserPatch, UserRecord};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

#[async_trait]
pub trait DeveloperStore: Send + Sync {
    async fn list(&self, query: &ReadQuery<'_>) -> Result<Vec<Value>, AppError>;

    async fn find(&self, id: Uuid) -> Result<Option<Value>, AppError>;

    async fn create(&self, record: &DeveloperRecord) -> Result<Value, AppError>;

    /// Apply a validated patch. `None` when no visible developer has this id.
    async fn update(&self, id: Uuid, patch: &DeveloperPatch) -> Result<Option<Value>, AppError>;

    /// `false` when no visible developer has this id.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Per-level statistics over developers rated at least 4.5, cheapest average first.
    async fn stats(&self) -> Result<Vec<LevelStats>, AppError>;

    /// Start dates within `year` grouped by month.
    async fn monthly_plan(&self, year: i32) -> Result<Vec<MonthlyPlan>, AppError>;

    /// Insert all records atomically. Returns the number inserted.
    async fn insert_many(&self, records: &[DeveloperRecord]) -> Result<u64, AppError>;

    /// Remove every developer, secret ones included. Returns the number removed.
    async fn delete_all(&self) -> Result<u64, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list(&self, query: &ReadQuery<'_>) -> Result<Vec<Value>, AppError>;

    async fn find(&self, id: Uuid) -> Result<Option<Value>, AppError>;

    async fn create(&self, record: &UserRecord, password_hash: &str) -> Result<Value, AppError>;

    /// The user document plus the stored password hash, for login.
    async fn find_with_password(&self, email: &str) -> Result<Option<(Value, String)>, AppError>;

    async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<Option<Value>, AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}
