//! Domain services: field validation and authentication primitives.

pub mod auth;
pub mod validation;
pub use auth::{hash_password, sign_token, verify_password, Claims};
pub use validation::Violations;
