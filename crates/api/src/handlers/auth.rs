//! Registration, login, and the current-user profile.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{extract::State, Json};
use jsonwebtoken::{encode, EncodingKey, Header};

use ssc_backend_domain::{AuthResponse, Claims, DomainError, LoginRequest, RegisterRequest, UserProfile};

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::AppState;

fn hash_password(password: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| DomainError::Internal(anyhow::anyhow!("failed to hash password: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, DomainError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| DomainError::Internal(anyhow::anyhow!("stored password hash is malformed: {e}")))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

fn issue_token(user_id: uuid::Uuid, secret: &str, expiry_minutes: i64) -> Result<(String, u64), DomainError> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is after the epoch")
        .as_secs();
    let expires_in = (expiry_minutes * 60).max(0) as u64;

    let claims = Claims { sub: user_id.to_string(), exp: now + expires_in, iat: now };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| DomainError::Internal(anyhow::anyhow!("failed to sign access token: {e}")))?;

    Ok((token, expires_in))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    use validator::Validate;
    req.validate().map_err(DomainError::from_validation_errors)?;

    if state.user_repo.get_by_email(&req.email).await?.is_some() {
        return Err(DomainError::Conflict("an account with this email already exists".to_string()).into());
    }

    let password_hash = hash_password(&req.password)?;
    let timezone = req.timezone.as_deref().unwrap_or(&state.config.default_timezone);

    let user = state
        .user_repo
        .create(&req.email, &password_hash, &req.display_name, timezone)
        .await?;

    let (access_token, expires_in) = issue_token(user.id, &state.config.jwt_secret, state.config.jwt_expiry_minutes)?;
    tracing::info!(user_id = %user.id, "registered new user");

    Ok(Json(AuthResponse { access_token, user_id: user.id, expires_in }))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    use validator::Validate;
    req.validate().map_err(DomainError::from_validation_errors)?;

    let user = state
        .user_repo
        .get_by_email(&req.email)
        .await?
        .ok_or_else(|| DomainError::Unauthorized("invalid email or password".to_string()))?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(DomainError::Unauthorized("invalid email or password".to_string()).into());
    }

    let (access_token, expires_in) = issue_token(user.id, &state.config.jwt_secret, state.config.jwt_expiry_minutes)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(AuthResponse { access_token, user_id: user.id, expires_in }))
}

pub async fn get_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .user_repo
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("user {user_id} not found")))?;

    Ok(Json(UserProfile {
        id: user.id,
        email: user.email,
        display_name: user.display_name,
        timezone: user.timezone,
        created_at: user.created_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }
}
