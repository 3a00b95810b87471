use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use tracing::{error, info, warn};
use uuid::Uuid;

use lumen_db::Repositories;
use lumen_types::api::{Claims, LoginRequest, LoginResponse};

use crate::error::{ApiError, blocking};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub repos: Repositories,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(repos: Repositories, jwt_secret: impl Into<String>) -> AppState {
        Arc::new(Self {
            repos,
            jwt_secret: jwt_secret.into(),
        })
    }
}

/// Argon2id hash for storing an admin password.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> Result<(), ApiError> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!("Stored password hash is unreadable: {}", e);
        ApiError::Internal
    })?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ApiError::Unauthorized)
}

/// Exchange admin credentials for a token. Unknown usernames are rejected;
/// accounts are only ever provisioned at startup.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.clone();
    let admin = blocking(&state, move |repos| repos.admins.find_by_username(&username))
        .await?
        .ok_or_else(|| {
            warn!("Login attempt for unknown admin '{}'", req.username);
            ApiError::Unauthorized
        })?;

    verify_password(&req.password, &admin.password_hash).inspect_err(|_| {
        warn!("Wrong password for admin '{}'", admin.username);
    })?;

    let token = create_token(&state.jwt_secret, admin.id, &admin.username).map_err(|e| {
        error!("Token signing failed: {}", e);
        ApiError::Internal
    })?;

    info!("Admin '{}' logged in", admin.username);
    Ok(Json(LoginResponse {
        admin_id: admin.id,
        username: admin.username,
        token,
    }))
}

pub fn create_token(secret: &str, admin_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: admin_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_against_their_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(verify_password("wrong", &hash), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn garbage_hash_is_an_internal_error() {
        assert!(matches!(verify_password("x", "not-a-hash"), Err(ApiError::Internal)));
    }
}
