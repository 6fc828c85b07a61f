//! Request arrival time, stamped by `middleware::stamp_request_time`.

use crate::sql::format_timestamp;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;

/// ISO-8601 time at which the request entered the router.
#[derive(Clone, Debug)]
pub struct RequestTime(pub String);

impl RequestTime {
    pub fn now() -> Self {
        RequestTime(format_timestamp(&Utc::now()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestTime
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestTime>()
            .cloned()
            .unwrap_or_else(RequestTime::now))
    }
}
