//! `/api/v1/users` routes: account administration plus signup and login.

use crate::handlers::auth::{login, signup};
use crate::handlers::user::{create, delete, get as read, list, update};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn user_routes(state: AppState) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/", get(list).post(create))
        .route("/:id", get(read).patch(update).delete(delete))
        .with_state(state)
}
