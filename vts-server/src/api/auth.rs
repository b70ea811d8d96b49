//! Authentication endpoints

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::auth::{self, AuthSession};
use crate::classify::validate::validate_credentials;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(session))
}

#[derive(Debug, Deserialize)]
struct CredentialsBody {
    email: String,
    password: String,
}

/// Create an account and log it in.
async fn signup(
    State(state): State<AppState>,
    Json(body): Json<CredentialsBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let email = body.email.trim().to_lowercase();
    validate_credentials(&email, &body.password)?;

    let user_id = db::users::create_user(&state.db, &email, &body.password).await?;
    let token = db::users::create_session(&state.db, user_id, &email).await?;
    info!("New account created: {}", email);

    Ok(Json(json!({
        "token": token,
        "user": { "id": user_id, "email": email },
    })))
}

/// Exchange credentials for a session token.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let email = body.email.trim().to_lowercase();
    validate_credentials(&email, &body.password)?;

    let user = db::users::find_user_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::Validation("Invalid email or password".to_string()))?;

    if !auth::verify_password(&body.password, &user.password_salt, &user.password_hash) {
        return Err(ApiError::Validation("Invalid email or password".to_string()));
    }

    let token = db::users::create_session(&state.db, user.id, &user.email).await?;
    info!("Login: {}", user.email);

    Ok(Json(json!({
        "token": token,
        "user": { "id": user.id, "email": user.email },
    })))
}

/// Drop the caller's session. Local state is cleared even if the delete
/// fails, so a half-dead database cannot trap a user in a session.
async fn logout(
    State(state): State<AppState>,
    session: AuthSession,
) -> Json<serde_json::Value> {
    if let Err(err) = db::users::delete_session(&state.db, &session.token).await {
        warn!("Logout could not remove session row: {}", err);
    }
    Json(json!({ "success": true }))
}

/// Who the bearer token belongs to.
async fn session(session: AuthSession) -> Json<serde_json::Value> {
    Json(json!({
        "user": { "id": session.user_id, "email": session.email },
    }))
}
