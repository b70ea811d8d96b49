//! Section, offense, and fine schedule queries

use sqlx::{Row, SqlitePool};
use uuid::Uuid;
use vts_common::models::{FineRate, Level, Offense, Section};

use crate::error::{ApiError, ApiResult};

pub async fn fetch_sections(pool: &SqlitePool) -> ApiResult<Vec<Section>> {
    let rows = sqlx::query("SELECT id, section_name FROM sections ORDER BY section_name")
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|r| {
            Ok(Section {
                id: parse_uuid(r.get("id"))?,
                section_name: r.get("section_name"),
            })
        })
        .collect()
}

pub async fn fetch_offenses(pool: &SqlitePool) -> ApiResult<Vec<Offense>> {
    let rows =
        sqlx::query("SELECT id, section_id, offense_name FROM offenses ORDER BY offense_name")
            .fetch_all(pool)
            .await?;

    rows.into_iter()
        .map(|r| {
            Ok(Offense {
                id: parse_uuid(r.get("id"))?,
                section_id: parse_uuid(r.get("section_id"))?,
                offense_name: r.get("offense_name"),
            })
        })
        .collect()
}

pub async fn fetch_offenses_by_section(
    pool: &SqlitePool,
    section_id: Uuid,
) -> ApiResult<Vec<Offense>> {
    let rows = sqlx::query(
        "SELECT id, section_id, offense_name FROM offenses WHERE section_id = ? ORDER BY offense_name",
    )
    .bind(section_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| {
            Ok(Offense {
                id: parse_uuid(r.get("id"))?,
                section_id: parse_uuid(r.get("section_id"))?,
                offense_name: r.get("offense_name"),
            })
        })
        .collect()
}

pub async fn fetch_fines_by_offense(
    pool: &SqlitePool,
    offense_id: Uuid,
) -> ApiResult<Vec<FineRate>> {
    let rows = sqlx::query(
        "SELECT id, offense_id, level, amount FROM fines WHERE offense_id = ? ORDER BY level",
    )
    .bind(offense_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| {
            let level: i64 = r.get("level");
            Ok(FineRate {
                id: parse_uuid(r.get("id"))?,
                offense_id: parse_uuid(r.get("offense_id"))?,
                level: Level::from_i64(level).ok_or_else(|| {
                    ApiError::Internal(format!("Corrupt fine level in database: {}", level))
                })?,
                amount: r.get("amount"),
            })
        })
        .collect()
}

/// Scheduled fine for one (offense, level) pair, if present.
pub async fn fine_amount(
    pool: &SqlitePool,
    offense_id: Uuid,
    level: Level,
) -> ApiResult<Option<f64>> {
    let amount: Option<f64> =
        sqlx::query_scalar("SELECT amount FROM fines WHERE offense_id = ? AND level = ?")
            .bind(offense_id.to_string())
            .bind(level.as_i64())
            .fetch_optional(pool)
            .await?;

    Ok(amount)
}

pub async fn create_section(pool: &SqlitePool, section_name: &str) -> ApiResult<Section> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO sections (id, section_name) VALUES (?, ?)")
        .bind(id.to_string())
        .bind(section_name)
        .execute(pool)
        .await
        .map_err(unique_to_validation("A section with this name already exists"))?;

    Ok(Section {
        id,
        section_name: section_name.to_string(),
    })
}

pub async fn rename_section(pool: &SqlitePool, id: Uuid, section_name: &str) -> ApiResult<()> {
    let result = sqlx::query("UPDATE sections SET section_name = ? WHERE id = ?")
        .bind(section_name)
        .bind(id.to_string())
        .execute(pool)
        .await
        .map_err(unique_to_validation("A section with this name already exists"))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFoundOrUnauthorized("Section not found".to_string()));
    }
    Ok(())
}

/// Delete a section; offenses and fines under it go with it.
pub async fn delete_section(pool: &SqlitePool, id: Uuid) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM sections WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFoundOrUnauthorized("Section not found".to_string()));
    }
    Ok(())
}

pub async fn create_offense(
    pool: &SqlitePool,
    section_id: Uuid,
    offense_name: &str,
) -> ApiResult<Offense> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO offenses (id, section_id, offense_name) VALUES (?, ?, ?)")
        .bind(id.to_string())
        .bind(section_id.to_string())
        .bind(offense_name)
        .execute(pool)
        .await
        .map_err(unique_to_validation(
            "This section already has an offense with this name",
        ))?;

    Ok(Offense {
        id,
        section_id,
        offense_name: offense_name.to_string(),
    })
}

pub async fn rename_offense(pool: &SqlitePool, id: Uuid, offense_name: &str) -> ApiResult<()> {
    let result = sqlx::query("UPDATE offenses SET offense_name = ? WHERE id = ?")
        .bind(offense_name)
        .bind(id.to_string())
        .execute(pool)
        .await
        .map_err(unique_to_validation(
            "This section already has an offense with this name",
        ))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFoundOrUnauthorized("Offense not found".to_string()));
    }
    Ok(())
}

pub async fn delete_offense(pool: &SqlitePool, id: Uuid) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM offenses WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFoundOrUnauthorized("Offense not found".to_string()));
    }
    Ok(())
}

/// Insert or replace the scheduled amount for one (offense, level) pair.
pub async fn upsert_fine(
    pool: &SqlitePool,
    offense_id: Uuid,
    level: Level,
    amount: f64,
) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO fines (id, offense_id, level, amount) VALUES (?, ?, ?, ?)
        ON CONFLICT (offense_id, level) DO UPDATE SET amount = excluded.amount
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(offense_id.to_string())
    .bind(level.as_i64())
    .bind(amount)
    .execute(pool)
    .await?;

    Ok(())
}

/// Default catalog: the nine statutory sections, each with a few common
/// offenses and escalating fine amounts per level. Idempotent upserts, so
/// reseeding never duplicates rows and never overwrites renamed entries.
pub async fn seed_catalog(pool: &SqlitePool) -> ApiResult<SeedSummary> {
    let mut summary = SeedSummary::default();

    for (section_name, offenses) in DEFAULT_CATALOG {
        let section_id = upsert_section(pool, section_name).await?;
        summary.sections += 1;

        for (offense_name, amounts) in *offenses {
            let offense_id = upsert_offense(pool, section_id, offense_name).await?;
            summary.offenses += 1;

            for (level, amount) in [
                (Level::First, amounts[0]),
                (Level::Second, amounts[1]),
                (Level::Third, amounts[2]),
            ] {
                upsert_fine(pool, offense_id, level, amount).await?;
                summary.fines += 1;
            }
        }
    }

    Ok(summary)
}

#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
pub struct SeedSummary {
    pub sections: usize,
    pub offenses: usize,
    pub fines: usize,
}

async fn upsert_section(pool: &SqlitePool, section_name: &str) -> ApiResult<Uuid> {
    sqlx::query("INSERT OR IGNORE INTO sections (id, section_name) VALUES (?, ?)")
        .bind(Uuid::new_v4().to_string())
        .bind(section_name)
        .execute(pool)
        .await?;

    let id: String = sqlx::query_scalar("SELECT id FROM sections WHERE section_name = ?")
        .bind(section_name)
        .fetch_one(pool)
        .await?;
    parse_uuid(id)
}

async fn upsert_offense(
    pool: &SqlitePool,
    section_id: Uuid,
    offense_name: &str,
) -> ApiResult<Uuid> {
    sqlx::query("INSERT OR IGNORE INTO offenses (id, section_id, offense_name) VALUES (?, ?, ?)")
        .bind(Uuid::new_v4().to_string())
        .bind(section_id.to_string())
        .bind(offense_name)
        .execute(pool)
        .await?;

    let id: String =
        sqlx::query_scalar("SELECT id FROM offenses WHERE section_id = ? AND offense_name = ?")
            .bind(section_id.to_string())
            .bind(offense_name)
            .fetch_one(pool)
            .await?;
    parse_uuid(id)
}

type CatalogEntry = (&'static str, &'static [(&'static str, [f64; 3])]);

const DEFAULT_CATALOG: &[CatalogEntry] = &[
    (
        "Vehicle Registration (Section 63)",
        &[
            ("Unregistered Vehicle", [500.0, 750.0, 1000.0]),
            ("Expired Registration", [300.0, 500.0, 750.0]),
        ],
    ),
    (
        "Plate Numbers (Section 64)",
        &[
            ("No Plate Number", [300.0, 500.0, 750.0]),
            ("Obscured Plate", [200.0, 350.0, 500.0]),
        ],
    ),
    (
        "Upkeeps and Accessories (Section 65)",
        &[
            ("Defective Lights", [150.0, 250.0, 400.0]),
            ("No Side Mirrors", [150.0, 250.0, 400.0]),
            ("Defective Muffler", [200.0, 350.0, 500.0]),
        ],
    ),
    (
        "Driver's License (Section 66)",
        &[
            ("Driving Without License", [500.0, 750.0, 1000.0]),
            ("Expired License", [300.0, 500.0, 750.0]),
        ],
    ),
    (
        "Sobriety and Courtesy (Section 67)",
        &[
            ("Driving Under the Influence", [1000.0, 2000.0, 3000.0]),
            ("Reckless Driving", [500.0, 750.0, 1000.0]),
        ],
    ),
    (
        "Traffic Flow (Section 68)",
        &[
            ("Disregarding Traffic Signs", [200.0, 350.0, 500.0]),
            ("Illegal Parking", [200.0, 350.0, 500.0]),
            ("Counterflow", [500.0, 750.0, 1000.0]),
        ],
    ),
    (
        "Speed Limit (Section 69)",
        &[("Overspeeding", [500.0, 750.0, 1000.0])],
    ),
    (
        "Seatbelt and Helmet (Section 70)",
        &[
            ("No Helmet", [150.0, 250.0, 400.0]),
            ("No Seatbelt", [150.0, 250.0, 400.0]),
        ],
    ),
    (
        "Passenger's Safety (Section 71)",
        &[
            ("Overloading", [300.0, 500.0, 750.0]),
            ("Passenger Without Helmet", [150.0, 250.0, 400.0]),
        ],
    ),
];

fn unique_to_validation(message: &'static str) -> impl Fn(sqlx::Error) -> ApiError {
    move |e| match e {
        sqlx::Error::Database(ref db) if db.message().contains("UNIQUE") => {
            ApiError::Validation(message.to_string())
        }
        other => ApiError::Database(other),
    }
}

fn parse_uuid(s: String) -> ApiResult<Uuid> {
    Uuid::parse_str(&s).map_err(|e| ApiError::Internal(format!("Corrupt UUID in database: {}", e)))
}
