//! Router assembly: resource routers, fallback, middleware chain.

use crate::error::AppError;
use crate::middleware::{normalize_errors, stamp_request_time};
use crate::routes::{common_routes, developer_routes, user_routes};
use crate::state::AppState;
use axum::{extract::OriginalUri, middleware, Router};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest accepted request body.
pub const BODY_LIMIT_BYTES: usize = 10 * 1024;

async fn not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::not_found(format!("Can't find {} on this server.", uri))
}

pub fn build_router(state: AppState) -> Router {
    let env = state.config.environment;
    let router = Router::new()
        .merge(common_routes())
        .nest("/api/v1/developers", developer_routes(state.clone()))
        .nest("/api/v1/users", user_routes(state))
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(middleware::from_fn(stamp_request_time))
        .layer(middleware::from_fn_with_state(env, normalize_errors));
    if env.is_development() {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}
