//! HTTP handlers for developers, users and authentication.

pub mod auth;
pub mod developer;
pub mod user;

use crate::error::AppError;
use uuid::Uuid;

/// Path ids that are not UUIDs are cast errors, reported as 400.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::cast("id", "uuid", raw))
}
