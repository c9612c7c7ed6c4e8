//! Authentication handlers

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Extension, Json};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::extractors::AuthedUser;
use super::models::{Claims, LoginRequest, RegisterRequest, User};
use crate::common::{generate_user_id, safe_email_log, ApiError, AppState};

/// Token lifetime for issued JWTs
const TOKEN_DAYS: i64 = 7;

/// POST /api/auth/register - Create a staff account
pub async fn register(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await;

    let email = payload.email.trim().to_lowercase();
    if payload.name.trim().is_empty() {
        return Err(ApiError::ValidationError("name is required".to_string()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::ValidationError(
            "a valid email is required".to_string(),
        ));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::ValidationError(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;
    if existing.is_some() {
        warn!(email = %safe_email_log(&email), "Registration rejected: email already in use");
        return Err(ApiError::BadRequest("email already registered".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| {
            warn!(error = %e, "Password hashing failed");
            ApiError::InternalServer("failed to hash password".to_string())
        })?
        .to_string();

    let user_id = generate_user_id();
    let role = if state.admin_emails.contains(&email) {
        "admin"
    } else {
        "staff"
    };
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, password_hash, role, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user_id)
    .bind(&email)
    .bind(payload.name.trim())
    .bind(&password_hash)
    .bind(role)
    .bind(&now)
    .execute(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    info!(
        user_id = %user_id,
        email = %safe_email_log(&email),
        role = %role,
        "User registered"
    );

    let token = issue_token(&user_id, &state.jwt_secret)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "token": token,
            "user": {
                "id": user_id,
                "email": email,
                "name": payload.name.trim(),
                "role": role
            }
        })),
    ))
}

/// POST /api/auth/login - Exchange credentials for a JWT
pub async fn login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await;

    let email = payload.email.trim().to_lowercase();

    let user: Option<User> = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    let Some(user) = user else {
        warn!(email = %safe_email_log(&email), "Login failed: unknown email");
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| ApiError::InternalServer("stored credential is unreadable".to_string()))?;
    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        warn!(email = %safe_email_log(&email), "Login failed: bad password");
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    let token = issue_token(&user.id, &state.jwt_secret)?;

    info!(user_id = %user.id, email = %safe_email_log(&email), "User logged in");

    Ok(Json(json!({
        "token": token,
        "user": user
    })))
}

/// GET /api/auth/me - Current authenticated user
pub async fn me(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await;

    let user: User = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&authed.id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    Ok(Json(json!({
        "user": user,
        "is_admin": authed.is_admin
    })))
}

fn issue_token(user_id: &str, secret: &str) -> Result<String, ApiError> {
    let exp = (Utc::now() + Duration::days(TOKEN_DAYS)).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        warn!(error = %e, "Failed to sign JWT");
        ApiError::InternalServer("failed to issue token".to_string())
    })
}
