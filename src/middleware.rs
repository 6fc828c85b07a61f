//! Router-wide middleware: request time stamping and the development error funnel.

use crate::config::Environment;
use crate::error::{render, AppError, PendingError, BODY_TOO_LARGE};
use crate::extractors::RequestTime;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

pub async fn stamp_request_time(mut req: Request, next: Next) -> Response {
    req.extensions_mut().insert(RequestTime::now());
    next.run(req).await
}

/// Error responses leave handlers in production shape with the `AppError`
/// attached. In development they are re-rendered with full detail. A bare 413
/// from the body limit layer carries no `AppError` and is rendered here.
pub async fn normalize_errors(State(env): State<Environment>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    if let Some(PendingError(err)) = response.extensions().get::<PendingError>().cloned() {
        return if env.is_development() { render(&err, env) } else { response };
    }
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return render(&AppError::operational(StatusCode::PAYLOAD_TOO_LARGE, BODY_TOO_LARGE), env);
    }
    response
}
