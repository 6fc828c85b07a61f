//! Developer catalog handlers.

use crate::error::AppError;
use crate::extractors::{ApiJson, QueryPairs, RequestTime};
use crate::features::QueryFeatures;
use crate::handlers::parse_id;
use crate::model::{DeveloperPatch, NewDeveloper, DEVELOPER_SCHEMA};
use crate::response::{success_created, success_many, success_one};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;

const NOT_FOUND: &str = "No developer found with that id";

/// Parameters forced by the top-5-cheap alias. They replace any the client sent.
const TOP_CHEAP: [(&str, &str); 3] = [
    ("limit", "5"),
    ("sort", "-ratingsAverage,hourlyRate"),
    ("fields", "name,hourlyRate,ratingsAverage,summary,experienceLevel"),
];

pub async fn list(
    State(state): State<AppState>,
    RequestTime(requested_at): RequestTime,
    QueryPairs(params): QueryPairs,
) -> Result<impl IntoResponse, AppError> {
    let query = QueryFeatures::apply(&DEVELOPER_SCHEMA, &params)?;
    let developers = state.developers.list(&query).await?;
    Ok(success_many("developers", developers, requested_at))
}

pub async fn top_cheap(
    state: State<AppState>,
    requested_at: RequestTime,
    QueryPairs(mut params): QueryPairs,
) -> Result<impl IntoResponse, AppError> {
    params.retain(|(k, _)| !TOP_CHEAP.iter().any(|(forced, _)| k == forced));
    params.extend(TOP_CHEAP.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    list(state, requested_at, QueryPairs(params)).await
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let developer = state
        .developers
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(success_one("developer", developer))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewDeveloper>,
) -> Result<impl IntoResponse, AppError> {
    let record = body.validate()?;
    let developer = state.developers.create(&record).await?;
    tracing::info!(name = %record.name, "developer created");
    Ok(success_created("developer", developer))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<DeveloperPatch>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    // The discount bound needs the stored rate when the patch leaves it alone.
    let current_rate = if body.price_discount.is_some() && body.hourly_rate.is_none() {
        let current = state
            .developers
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
        current.get("hourlyRate").and_then(Value::as_f64)
    } else {
        None
    };
    let patch = body.validate(current_rate)?;
    let developer = state
        .developers
        .update(id, &patch)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(success_one("developer", developer))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    if !state.developers.delete(id).await? {
        return Err(AppError::not_found(NOT_FOUND));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let stats = state.developers.stats().await?;
    Ok(success_one("stats", stats))
}

pub async fn monthly_plan(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let year: i32 = year
        .trim()
        .parse()
        .map_err(|_| AppError::cast("year", "number", year.as_str()))?;
    let plan = state.developers.monthly_plan(year).await?;
    Ok(success_one("plan", plan))
}
