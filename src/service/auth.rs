//! Password hashing (Argon2id) and session token signing (HS256 JWT).
//!
//! Hashing is CPU-bound and memory-hard, so the async wrappers run it on the
//! blocking pool.

use crate::config::JwtConfig;
use crate::error::AppError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Token payload: the user id plus issue and expiry times in seconds since the epoch.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub id: String,
    pub iat: i64,
    pub exp: i64,
}

fn hash_blocking(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::PasswordHash(e.to_string()))
}

fn verify_blocking(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AppError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

/// Hash a plaintext password into a PHC string.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|e| AppError::Internal(format!("hash task: {}", e)))?
}

/// Stand-in hash checked when no account matches, so an unknown email costs
/// the same Argon2 work as a wrong password.
fn dummy_hash() -> Result<&'static str, AppError> {
    static DUMMY: OnceLock<String> = OnceLock::new();
    if let Some(hash) = DUMMY.get() {
        return Ok(hash);
    }
    let hash = hash_blocking("devcatalog-no-such-account")?;
    Ok(DUMMY.get_or_init(|| hash))
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is malformed.
/// With no stored hash the stand-in is verified instead and the result is `Ok(false)`.
pub async fn verify_password(password: String, hash: Option<String>) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_blocking(&password, &hash),
        None => {
            verify_blocking(&password, dummy_hash()?)?;
            Ok(false)
        }
    })
    .await
    .map_err(|e| AppError::Internal(format!("verify task: {}", e)))?
}

pub fn sign_token(user_id: &str, jwt: &JwtConfig) -> Result<String, AppError> {
    let iat = Utc::now().timestamp();
    let ttl = i64::try_from(jwt.expires_in.as_secs()).unwrap_or(i64::MAX);
    let claims = Claims {
        id: user_id.to_string(),
        iat,
        exp: iat.saturating_add(ttl),
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt.secret.as_bytes()))?;
    Ok(token)
}
