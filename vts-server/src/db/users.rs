//! User and session queries

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::auth::{self, AuthSession};
use crate::error::{ApiError, ApiResult};

/// Stored credential material for one user.
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_salt: String,
    pub password_hash: String,
}

/// Insert a new user with a fresh salt. Fails on duplicate email.
pub async fn create_user(pool: &SqlitePool, email: &str, password: &str) -> ApiResult<Uuid> {
    let id = Uuid::new_v4();
    let salt = auth::generate_salt();
    let hash = auth::hash_password(password, &salt);

    sqlx::query(
        "INSERT INTO users (id, email, password_salt, password_hash) VALUES (?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(email)
    .bind(&salt)
    .bind(&hash)
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.message().contains("UNIQUE") => {
            ApiError::Validation("An account with this email already exists".to_string())
        }
        other => ApiError::Database(other),
    })?;

    Ok(id)
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> ApiResult<Option<UserRow>> {
    let row = sqlx::query(
        "SELECT id, email, password_salt, password_hash FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    row.map(|r| {
        let id: String = r.get("id");
        Ok(UserRow {
            id: parse_uuid(&id)?,
            email: r.get("email"),
            password_salt: r.get("password_salt"),
            password_hash: r.get("password_hash"),
        })
    })
    .transpose()
}

/// Mint a session token for a logged-in user.
pub async fn create_session(pool: &SqlitePool, user_id: Uuid, email: &str) -> ApiResult<String> {
    let token = auth::generate_token();

    sqlx::query("INSERT INTO sessions (token, user_id, email) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(user_id.to_string())
        .bind(email)
        .execute(pool)
        .await?;

    Ok(token)
}

pub async fn find_session(pool: &SqlitePool, token: &str) -> ApiResult<Option<AuthSession>> {
    let row = sqlx::query("SELECT token, user_id, email FROM sessions WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?;

    row.map(|r| {
        let user_id: String = r.get("user_id");
        Ok(AuthSession {
            user_id: parse_uuid(&user_id)?,
            email: r.get("email"),
            token: r.get("token"),
        })
    })
    .transpose()
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> ApiResult<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

fn parse_uuid(s: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| ApiError::Internal(format!("Corrupt UUID in database: {}", e)))
}
