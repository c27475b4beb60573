//! Auth routes for registration, login, logout, and session status

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::{Json as JsonBody, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth::SESSION_COOKIE;
use crate::database::CreateUserError;
use crate::database::store::verify_password;
use crate::error::ApiError;
use crate::server::AppState;

/// Body of both /register and /login. The `username` field carries the
/// email address, matching the client form field names.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

fn session_cookie(token: Uuid, ttl_hours: i64, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token.to_string());
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::hours(ttl_hours));
    if secure {
        cookie.set_secure(true);
    }
    cookie
}

fn non_empty(field: &str, name: &str) -> Result<(), ApiError> {
    if field.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("Missing {name}")));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(payload): JsonBody<CredentialsRequest>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    // Emails are taken exactly as received, no normalization
    non_empty(&payload.username, "username")?;
    non_empty(&payload.password, "password")?;

    let user = match state.credentials.create(&payload.username, &payload.password).await {
        Ok(user) => user,
        Err(CreateUserError::EmailTaken) => return Err(ApiError::EmailTaken),
        Err(CreateUserError::Store(err)) => return Err(ApiError::Store(err)),
    };

    tracing::info!("Registered new user {}", user.id);

    // Session must be visible in the store before the caller hears success
    let token = state.gate.store().create(user.id, &user.email);
    let jar = jar.add(session_cookie(token, state.session_ttl_hours, state.cookie_secure));

    Ok((
        jar,
        Json(json!({
            "success": true,
            "authenticated": true,
            "email": user.email,
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(payload): JsonBody<CredentialsRequest>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    non_empty(&payload.username, "username")?;
    non_empty(&payload.password, "password")?;

    let user = state
        .credentials
        .find_by_email(&payload.username)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::WrongPassword);
    }

    let token = state.gate.store().create(user.id, &user.email);
    let jar = jar.add(session_cookie(token, state.session_ttl_hours, state.cookie_secure));

    tracing::info!("Login successful for user {}", user.id);

    Ok((
        jar,
        Json(json!({
            "success": true,
            "authenticated": true,
            "email": user.email,
        })),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<Value>) {
    if let Some(token) = jar
        .get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
    {
        state.gate.store().destroy(token);
    }

    let removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    (jar.remove(removal), Json(json!({ "success": true })))
}

pub async fn auth_status(State(state): State<AppState>, jar: CookieJar) -> Json<Value> {
    let session = jar
        .get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
        .and_then(|token| state.gate.store().get(token));

    match session {
        Some(session) => Json(json!({ "authenticated": true, "email": session.email })),
        None => Json(json!({ "authenticated": false })),
    }
}

pub fn create_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/auth-status", get(auth_status))
}
