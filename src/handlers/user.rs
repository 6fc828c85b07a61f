//! User administration handlers. Accounts created here get no token.

use crate::error::AppError;
use crate::extractors::{ApiJson, QueryPairs, RequestTime};
use crate::features::QueryFeatures;
use crate::handlers::parse_id;
use crate::model::{NewUser, UserPatch, USER_SCHEMA};
use crate::response::{success_created, success_many, success_one};
use crate::service::hash_password;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

const NOT_FOUND: &str = "No user found with that id";

pub async fn list(
    State(state): State<AppState>,
    RequestTime(requested_at): RequestTime,
    QueryPairs(params): QueryPairs,
) -> Result<impl IntoResponse, AppError> {
    let query = QueryFeatures::apply(&USER_SCHEMA, &params)?;
    let users = state.users.list(&query).await?;
    Ok(success_many("users", users, requested_at))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let user = state
        .users
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(success_one("user", user))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewUser>,
) -> Result<impl IntoResponse, AppError> {
    let record = body.validate()?;
    let hash = hash_password(record.password.clone()).await?;
    let user = state.users.create(&record, &hash).await?;
    Ok(success_created("user", user))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UserPatch>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let patch = body.validate()?;
    let user = state
        .users
        .update(id, &patch)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(success_one("user", user))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    if !state.users.delete(id).await? {
        return Err(AppError::not_found(NOT_FOUND));
    }
    Ok(StatusCode::NO_CONTENT)
}
