//! `/api/v1/developers` routes. Static segments win over `/:id`.

use crate::handlers::developer::{create, delete, get as read, list, monthly_plan, stats, top_cheap, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn developer_routes(state: AppState) -> Router {
    Router::new()
        .route("/top-5-cheap", get(top_cheap))
        .route("/developer-stats", get(stats))
        .route("/monthly-plan/:year", get(monthly_plan))
        .route("/", get(list).post(create))
        .route("/:id", get(read).patch(update).delete(delete))
        .with_state(state)
}
