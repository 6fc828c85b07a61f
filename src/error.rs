//! Typed errors and their HTTP rendering.
//!
//! Every handler returns `Result<_, AppError>`. Rendering happens once, at the
//! boundary: [`AppError::into_response`] produces the terse production shape and
//! stashes the error so `middleware::normalize_errors` can re-render it verbosely
//! when the server runs in development mode.

use crate::config::Environment;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// PostgreSQL SQLSTATE for a unique index violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Message sent for every error that is not client-caused.
pub const GENERIC_MESSAGE: &str = "Something went very wrong!";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// One failed field constraint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Expected, client-caused failure with its own status and message.
    #[error("{message}")]
    Operational { status: StatusCode, message: String },
    /// A path, query or body value that cannot be cast to the field's type.
    #[error("cast to {kind} failed for value \"{value}\" at path \"{path}\"")]
    Cast {
        path: String,
        kind: &'static str,
        value: String,
    },
    #[error("validation failed: {}", join_messages(.0, ", "))]
    Validation(Vec<FieldError>),
    /// Unique index violation. `raw` is the driver's message and detail text.
    #[error("duplicate key: {raw}")]
    DuplicateKey { raw: String },
    #[error("database: {0}")]
    Db(#[source] sqlx::Error),
    #[error("token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hash: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("internal: {0}")]
    Internal(String),
}

fn join_messages(errors: &[FieldError], sep: &str) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(sep)
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let detail = db
                    .try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
                    .and_then(|pg| pg.detail());
                let raw = match detail {
                    Some(detail) => format!("{} {}", db.message(), detail),
                    None => db.message().to_string(),
                };
                return AppError::DuplicateKey { raw };
            }
        }
        AppError::Db(e)
    }
}

/// Message for bodies over the size limit.
pub const BODY_TOO_LARGE: &str = "Request body is too large";

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::operational(StatusCode::PAYLOAD_TOO_LARGE, BODY_TOO_LARGE);
        }
        AppError::bad_request(rejection.body_text())
    }
}

impl AppError {
    pub fn operational(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::Operational {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, message)
    }

    pub fn cast(path: impl Into<String>, kind: &'static str, value: impl Into<String>) -> Self {
        AppError::Cast {
            path: path.into(),
            kind,
            value: value.into(),
        }
    }

    /// Status before any translation; unset means 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Operational { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_operational(&self) -> bool {
        matches!(self, AppError::Operational { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Operational { .. } => "OperationalError",
            AppError::Cast { .. } => "CastError",
            AppError::Validation(_) => "ValidationError",
            AppError::DuplicateKey { .. } => "DuplicateKeyError",
            AppError::Db(_) => "DatabaseError",
            AppError::Token(_) => "TokenError",
            AppError::PasswordHash(_) => "PasswordHashError",
            AppError::Config(_) => "ConfigError",
            AppError::Internal(_) => "InternalError",
        }
    }

    /// Status and message a client may see in production, after known
    /// persistence shapes are translated. `None` means the error must not leak.
    pub fn client_facing(&self) -> Option<(StatusCode, String)> {
        match self {
            AppError::Operational { status, message } => Some((*status, message.clone())),
            AppError::Cast { path, value, .. } => {
                Some((StatusCode::BAD_REQUEST, format!("Invalid {}: {}", path, value)))
            }
            AppError::DuplicateKey { raw } => Some((
                StatusCode::BAD_REQUEST,
                format!(
                    "Duplicate field value: {}. Please use another value.",
                    duplicate_value(raw)
                ),
            )),
            AppError::Validation(errors) => Some((
                StatusCode::BAD_REQUEST,
                format!("Invalid input data. {}", join_messages(errors, ". ")),
            )),
            _ => None,
        }
    }
}

/// Pull the conflicting value out of the driver text, quoted.
/// PostgreSQL puts it in the detail (`Key (name)=(Ada) already exists.`);
/// otherwise the first quoted substring is used.
pub fn duplicate_value(raw: &str) -> String {
    static KEY_DETAIL: OnceLock<Regex> = OnceLock::new();
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    let key_detail =
        KEY_DETAIL.get_or_init(|| Regex::new(r"Key \(([^)]*)\)=\((.*)\) already exists").expect("valid regex"));
    if let Some(value) = key_detail.captures(raw).and_then(|c| c.get(2)) {
        return format!("\"{}\"", value.as_str());
    }
    let quoted = QUOTED.get_or_init(|| Regex::new(r#""[^"]*"|'[^']*'"#).expect("valid regex"));
    quoted
        .find(raw)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "value".into())
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

fn status_text(status: StatusCode) -> &'static str {
    if status.is_client_error() {
        "fail"
    } else {
        "error"
    }
}

/// Render `err` for the given environment.
pub fn render(err: &AppError, env: Environment) -> Response {
    match env {
        Environment::Development => render_development(err),
        Environment::Production => render_production(err),
    }
}

fn render_production(err: &AppError) -> Response {
    match err.client_facing() {
        Some((status, message)) => (
            status,
            Json(ErrorBody {
                status: status_text(status),
                message,
            }),
        )
            .into_response(),
        None => {
            tracing::error!(error = %err, kind = err.kind(), "unhandled error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    status: "error",
                    message: GENERIC_MESSAGE.into(),
                }),
            )
                .into_response()
        }
    }
}

fn render_development(err: &AppError) -> Response {
    let status = err.status_code();
    let mut stack = Vec::new();
    let mut current: Option<&dyn std::error::Error> = Some(err);
    while let Some(e) = current {
        stack.push(e.to_string());
        current = e.source();
    }
    let mut error = serde_json::json!({
        "kind": err.kind(),
        "statusCode": status.as_u16(),
        "status": status_text(status),
        "isOperational": err.is_operational(),
        "message": err.to_string(),
    });
    if let AppError::Validation(fields) = err {
        error["errors"] = serde_json::to_value(fields).unwrap_or_default();
    }
    let body = serde_json::json!({
        "status": status_text(status),
        "error": error,
        "message": err.to_string(),
        "stack": stack,
    });
    (status, Json(body)).into_response()
}

/// Error carried in response extensions until the funnel middleware renders it.
#[derive(Clone, Debug)]
pub struct PendingError(pub Arc<AppError>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = render(&self, Environment::Production);
        response.extensions_mut().insert(PendingError(Arc::new(self)));
        response
    }
}
