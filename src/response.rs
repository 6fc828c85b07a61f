//! Standard success envelope: `{ status: "success", requestedAt?, results?, token?, data? }`.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Success {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Success {
    fn new() -> Self {
        Success {
            status: "success",
            requested_at: None,
            results: None,
            token: None,
            data: None,
        }
    }
}

/// `data: { <key>: value }`
fn keyed<T: Serialize>(key: &str, value: T) -> Value {
    let mut data = Map::new();
    data.insert(key.to_string(), serde_json::to_value(value).unwrap_or(Value::Null));
    Value::Object(data)
}

pub fn success_one<T: Serialize>(key: &str, value: T) -> (StatusCode, Json<Success>) {
    (
        StatusCode::OK,
        Json(Success {
            data: Some(keyed(key, value)),
            ..Success::new()
        }),
    )
}

pub fn success_created<T: Serialize>(key: &str, value: T) -> (StatusCode, Json<Success>) {
    (
        StatusCode::CREATED,
        Json(Success {
            data: Some(keyed(key, value)),
            ..Success::new()
        }),
    )
}

/// List envelope with the request time and the number of results.
pub fn success_many<T: Serialize>(key: &str, items: Vec<T>, requested_at: String) -> (StatusCode, Json<Success>) {
    let results = items.len();
    (
        StatusCode::OK,
        Json(Success {
            requested_at: Some(requested_at),
            results: Some(results),
            data: Some(keyed(key, items)),
            ..Success::new()
        }),
    )
}

/// Token envelope; `user` is included on signup only.
pub fn success_token(status: StatusCode, token: String, user: Option<Value>) -> (StatusCode, Json<Success>) {
    (
        status,
        Json(Success {
            token: Some(token),
            data: user.map(|u| keyed("user", u)),
            ..Success::new()
        }),
    )
}
