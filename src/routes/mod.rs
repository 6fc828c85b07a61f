//! Route tables.

pub mod common;
pub mod developer;
pub mod user;

pub use common::common_routes;
pub use developer::developer_routes;
pub use user::user_routes;
