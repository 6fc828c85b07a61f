//! Entity schemas and request bodies for developers and users.

pub mod dates;
pub mod developer;
pub mod schema;
pub mod user;

pub use developer::{
    add_derived_fields, slugify, DeveloperPatch, DeveloperRecord, ExperienceLevel, LevelStats, MonthlyPlan,
    NewDeveloper, DEVELOPER_SCHEMA, PLAN_MAX_GROUPS, STATS_MIN_RATING, year_bounds,
};
pub use schema::{ColumnDef, ColumnKind, EntitySchema};
pub use user::{Credentials, NewUser, UserPatch, UserRecord, USER_SCHEMA};
