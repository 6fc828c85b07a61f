//! Request extractors.

pub mod body;
pub mod request_time;
pub use body::{ApiJson, QueryPairs};
pub use request_time::RequestTime;
