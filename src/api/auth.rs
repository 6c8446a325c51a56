//! Registration, login/logout and the session extractor.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::Rng;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::db::{LoginRequest, LoginResponse, RegisterRequest, Role, User, UserResponse};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extractors::ApiJson;
use super::timed;
use super::validation::{validate_email, validate_one_of, validate_password, validate_person_name};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random session token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Emails are compared case-insensitively
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_register_request(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("name", validate_person_name(&req.name))
        .check("email", validate_email(&req.email))
        .check("password", validate_password(&req.password))
        .check("role", validate_one_of(&req.role, "role", &Role::ALL));
    errors.finish()
}

fn validate_login_request(req: &LoginRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("email", validate_email(&req.email))
        .check("password", validate_password(&req.password));
    errors.finish()
}

/// Register a new client or photographer account
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_register_request(&req)?;

    let email = normalize_email(&req.email);

    let existing: Option<(String,)> = timed(
        &state,
        sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&state.db),
    )
    .await?;

    if existing.is_some() {
        return Err(ApiError::bad_request("Email already registered"));
    }

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to hash password")
    })?;

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    timed(
        &state,
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(req.name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(&req.role)
        .bind(&now)
        .bind(&now)
        .execute(&state.db),
    )
    .await
    .map_err(|e| {
        // Lost a race with a concurrent registration of the same address
        if e.status() == StatusCode::BAD_REQUEST {
            ApiError::bad_request("Email already registered")
        } else {
            e
        }
    })?;

    tracing::info!(user_id = %id, role = %req.role, "Registered user");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id,
            name: req.name.trim().to_string(),
            email,
            role: req.role,
            created_at: now.clone(),
            updated_at: now,
        }),
    ))
}

/// Check credentials, open a session and set the session cookie
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    validate_login_request(&req)?;

    let email = normalize_email(&req.email);

    let user: Option<User> = timed(
        &state,
        sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&state.db),
    )
    .await?;

    // Unknown email and wrong password must be indistinguishable
    let user = match user {
        Some(user) if verify_password(&req.password, &user.password_hash) => user,
        _ => {
            tracing::warn!("Rejected login attempt");
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
    };

    let token = generate_token();
    let token_hash = hash_token(&token);
    let now = chrono::Utc::now();
    let expires_at = now
        .checked_add_signed(chrono::Duration::hours(state.config.auth.session_ttl_hours))
        .ok_or_else(|| ApiError::internal("Invalid session lifetime"))?
        .to_rfc3339();

    // Sessions are only created here, so expired ones are swept here too
    let swept = timed(
        &state,
        sqlx::query("DELETE FROM sessions WHERE user_id = ? AND expires_at <= ?")
            .bind(&user.id)
            .bind(now.to_rfc3339())
            .execute(&state.db),
    )
    .await?;
    if swept.rows_affected() > 0 {
        tracing::debug!(
            user_id = %user.id,
            removed = swept.rows_affected(),
            "Removed expired sessions"
        );
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    timed(
        &state,
        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&session_id)
        .bind(&user.id)
        .bind(&token_hash)
        .bind(&expires_at)
        .bind(now.to_rfc3339())
        .execute(&state.db),
    )
    .await?;

    tracing::info!(user_id = %user.id, "User logged in");

    let cookie = Cookie::build((state.config.auth.cookie_name.clone(), token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.auth.cookie_secure);

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            message: "Login successful".to_string(),
            token,
            user: UserResponse::from(user),
        }),
    ))
}

/// Destroy the caller's session, if any, and clear the cookie
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    if let Some(token) = extract_token(&headers, &jar, &state.config.auth.cookie_name) {
        let result = timed(
            &state,
            sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
                .bind(hash_token(&token))
                .execute(&state.db),
        )
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!("Session closed");
        }
    }

    let removal = Cookie::build((state.config.auth.cookie_name.clone(), "")).path("/");

    Ok((
        jar.remove(removal),
        Json(json!({ "message": "Logged out successfully" })),
    ))
}

/// Return the user owning the current session
pub async fn me(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Bearer token first, then the session cookie
fn extract_token(headers: &HeaderMap, jar: &CookieJar, cookie_name: &str) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization").and_then(|h| h.to_str().ok()) {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            if !token.trim().is_empty() {
                return Some(token.trim().to_string());
            }
        }
    }

    jar.get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Look up the user behind a session token; expired sessions don't count
pub async fn get_current_user(state: &AppState, token: &str) -> Result<User, ApiError> {
    let now = chrono::Utc::now().to_rfc3339();
    let user: Option<User> = timed(
        state,
        sqlx::query_as(
            r#"
            SELECT u.* FROM users u
            JOIN sessions s ON s.user_id = u.id
            WHERE s.token_hash = ? AND s.expires_at > ?
            "#,
        )
        .bind(hash_token(token))
        .bind(&now)
        .fetch_optional(&state.db),
    )
    .await?;

    user.ok_or_else(|| ApiError::unauthorized("Not authenticated"))
}

/// Extractor for the authenticated user of a request
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = extract_token(&parts.headers, &jar, &state.config.auth.cookie_name)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;
        get_current_user(state, &token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("rahasia123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("rahasia123", &hash));
        assert!(!verify_password("rahasia124", &hash));
        assert!(!verify_password("rahasia123", "not-a-hash"));
    }

    #[test]
    fn test_tokens_are_random_and_hashed() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_eq!(hash_token(&a), hash_token(&a));
        assert_ne!(hash_token(&a), a);
    }

    #[test]
    fn test_extract_token_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", "Bearer abc".parse().unwrap());
        headers.insert("Cookie", "fotografi_session=xyz".parse().unwrap());
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(
            extract_token(&headers, &jar, "fotografi_session").as_deref(),
            Some("abc")
        );

        headers.remove("Authorization");
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(
            extract_token(&headers, &jar, "fotografi_session").as_deref(),
            Some("xyz")
        );

        let empty = HeaderMap::new();
        let jar = CookieJar::from_headers(&empty);
        assert!(extract_token(&empty, &jar, "fotografi_session").is_none());
    }

    #[test]
    fn test_register_validation_collects_fields() {
        let req = RegisterRequest {
            name: "A1".to_string(),
            email: "nope".to_string(),
            password: "short".to_string(),
            role: "admin".to_string(),
        };
        let err = validate_register_request(&req).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message().contains("4 fields"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ayu@Example.COM "), "ayu@example.com");
    }
}
