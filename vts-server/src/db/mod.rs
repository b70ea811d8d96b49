//! Database initialization and access
//!
//! SQLite via sqlx. The schema is created on first run with
//! `CREATE TABLE IF NOT EXISTS` migrations; timestamps are stored as
//! RFC 3339 text and dates as `YYYY-MM-DD` text.

pub mod catalog;
pub mod users;
pub mod violations;

use std::path::Path;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::ApiResult;

/// Open (creating if needed) the database and run migrations.
pub async fn init_database(db_path: &Path) -> ApiResult<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create all tables. Idempotent, safe to call on every startup.
pub async fn init_tables(pool: &SqlitePool) -> ApiResult<()> {
    create_users_table(pool).await?;
    create_sessions_table(pool).await?;
    create_sections_table(pool).await?;
    create_offenses_table(pool).await?;
    create_fines_table(pool).await?;
    create_violations_table(pool).await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_salt TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            email TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_sections_table(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sections (
            id TEXT PRIMARY KEY,
            section_name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_offenses_table(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS offenses (
            id TEXT PRIMARY KEY,
            section_id TEXT NOT NULL REFERENCES sections(id) ON DELETE CASCADE,
            offense_name TEXT NOT NULL,
            UNIQUE (section_id, offense_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_offenses_section ON offenses(section_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_fines_table(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fines (
            id TEXT PRIMARY KEY,
            offense_id TEXT NOT NULL REFERENCES offenses(id) ON DELETE CASCADE,
            level INTEGER NOT NULL CHECK (level IN (1, 2, 3)),
            amount REAL NOT NULL CHECK (amount >= 0),
            UNIQUE (offense_id, level)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_fines_offense ON fines(offense_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_violations_table(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS violations (
            id TEXT PRIMARY KEY,
            no INTEGER NOT NULL,
            name TEXT NOT NULL,
            plate_number TEXT NOT NULL,
            date TEXT,
            section TEXT NOT NULL,
            section_id TEXT NOT NULL,
            offenses TEXT NOT NULL,
            offense_id TEXT NOT NULL,
            level TEXT NOT NULL CHECK (level IN ('1', '2', '3')),
            fine REAL NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'Unpaid' CHECK (status IN ('Unpaid', 'Pending', 'Paid')),
            official_receipt_number TEXT,
            date_paid TEXT,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_violations_user ON violations(user_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_violations_user_no ON violations(user_id, no)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_violations_plate ON violations(plate_number)")
        .execute(pool)
        .await?;

    Ok(())
}
