//! devcatalog: developer catalog and user accounts REST API on PostgreSQL.

pub mod app;
pub mod case;
pub mod config;
pub mod error;
pub mod extractors;
pub mod features;
pub mod handlers;
pub mod middleware;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use app::build_router;
pub use config::{AppConfig, Environment};
pub use error::{AppError, ConfigError};
pub use features::{QueryFeatures, ReadQuery};
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_tables, DeveloperStore, PgDeveloperStore, PgUserStore, UserStore};
