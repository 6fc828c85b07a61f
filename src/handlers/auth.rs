//! Signup and login.

use crate::error::AppError;
use crate::extractors::ApiJson;
use crate::model::{Credentials, NewUser};
use crate::response::success_token;
use crate::service::{hash_password, sign_token, verify_password};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde_json::Value;

const MISSING_CREDENTIALS: &str = "Please provide email and password!";
const BAD_CREDENTIALS: &str = "Incorrect email or password";

fn user_id(user: &Value) -> Result<&str, AppError> {
    user.get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Internal("stored user has no id".into()))
}

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewUser>,
) -> Result<impl IntoResponse, AppError> {
    let record = body.validate()?;
    let hash = hash_password(record.password.clone()).await?;
    let user = state.users.create(&record, &hash).await?;
    let token = sign_token(user_id(&user)?, &state.config.jwt)?;
    tracing::info!(email = %record.email, "user signed up");
    Ok(success_token(StatusCode::CREATED, token, Some(user)))
}

/// Unknown email and wrong password fail identically.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Credentials>,
) -> Result<impl IntoResponse, AppError> {
    let (email, password) = body
        .complete()
        .ok_or_else(|| AppError::bad_request(MISSING_CREDENTIALS))?;
    let (user, hash) = state.users.find_with_password(&email).await?.unzip();
    // Unknown emails still pay for one hash verification.
    let verified = verify_password(password.to_string(), hash).await?;
    let user = match user {
        Some(user) if verified => user,
        _ => return Err(AppError::unauthorized(BAD_CREDENTIALS)),
    };
    let token = sign_token(user_id(&user)?, &state.config.jwt)?;
    Ok(success_token(StatusCode::OK, token, None))
}
