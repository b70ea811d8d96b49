//! Violation record queries
//!
//! All queries are scoped by the owning user. Records are mapped by hand:
//! levels travel as digit strings, payment state splits across the status,
//! receipt, and date-paid columns.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;
use vts_common::models::{Level, PaymentStatus, ViolationRecord};

use crate::error::{ApiError, ApiResult};

/// Optional list filters, matching the dashboard's search controls.
#[derive(Debug, Clone, Default)]
pub struct ViolationFilter {
    /// Case-insensitive substring over name, plate, offense, and receipt
    pub search: Option<String>,
    /// Exact status label: Unpaid, Pending, or Paid
    pub status: Option<String>,
    pub section_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

const SELECT_COLUMNS: &str = "SELECT id, no, name, plate_number, date, section, section_id, \
     offenses, offense_id, level, fine, status, official_receipt_number, date_paid, \
     user_id, created_at, updated_at FROM violations";

/// All of one user's records, ordered by sequence number.
pub async fn fetch_all_for_user(
    pool: &SqlitePool,
    user_id: Uuid,
) -> ApiResult<Vec<ViolationRecord>> {
    let sql = format!("{} WHERE user_id = ? ORDER BY no ASC", SELECT_COLUMNS);
    let rows = sqlx::query(&sql)
        .bind(user_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(record_from_row).collect()
}

/// One record by id, scoped to its owner. A miss and a foreign record are
/// indistinguishable to the caller.
pub async fn fetch_one(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> ApiResult<ViolationRecord> {
    let sql = format!("{} WHERE id = ? AND user_id = ?", SELECT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => record_from_row(&row),
        None => Err(ApiError::NotFoundOrUnauthorized("Record not found".to_string())),
    }
}

/// Filtered listing for the dashboard and for export.
pub async fn fetch_filtered(
    pool: &SqlitePool,
    user_id: Uuid,
    filter: &ViolationFilter,
) -> ApiResult<Vec<ViolationRecord>> {
    let mut sql = format!("{} WHERE user_id = ?", SELECT_COLUMNS);
    let mut binds: Vec<String> = vec![user_id.to_string()];

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        sql.push_str(
            " AND (lower(name) LIKE ? OR lower(plate_number) LIKE ? \
             OR lower(offenses) LIKE ? OR lower(coalesce(official_receipt_number, '')) LIKE ?)",
        );
        let pattern = format!("%{}%", search.to_lowercase());
        for _ in 0..4 {
            binds.push(pattern.clone());
        }
    }
    if let Some(status) = filter.status.as_deref().filter(|s| !s.is_empty()) {
        sql.push_str(" AND status = ?");
        binds.push(status.to_string());
    }
    if let Some(section_id) = filter.section_id {
        sql.push_str(" AND section_id = ?");
        binds.push(section_id.to_string());
    }
    if let Some(from) = filter.date_from {
        sql.push_str(" AND date IS NOT NULL AND date >= ?");
        binds.push(from.format("%Y-%m-%d").to_string());
    }
    if let Some(to) = filter.date_to {
        sql.push_str(" AND date IS NOT NULL AND date <= ?");
        binds.push(to.format("%Y-%m-%d").to_string());
    }
    sql.push_str(" ORDER BY no ASC");

    let mut query = sqlx::query(&sql);
    for bind in &binds {
        query = query.bind(bind);
    }
    let rows = query.fetch_all(pool).await?;

    rows.iter().map(record_from_row).collect()
}

pub async fn insert(pool: &SqlitePool, record: &ViolationRecord) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO violations
            (id, no, name, plate_number, date, section, section_id, offenses, offense_id,
             level, fine, status, official_receipt_number, date_paid, user_id,
             created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.no)
    .bind(&record.name)
    .bind(&record.plate_number)
    .bind(record.date.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(&record.section)
    .bind(record.section_id.to_string())
    .bind(&record.offenses)
    .bind(record.offense_id.to_string())
    .bind(record.level.as_str())
    .bind(record.fine)
    .bind(record.status.label())
    .bind(record.status.receipt_number())
    .bind(record.status.date_paid().map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(record.user_id.to_string())
    .bind(record.created_at.to_rfc3339())
    .bind(record.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Full-row update, scoped to the owner. Zero rows affected means the
/// record does not exist or belongs to someone else.
pub async fn update(pool: &SqlitePool, record: &ViolationRecord) -> ApiResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE violations SET
            no = ?, name = ?, plate_number = ?, date = ?, section = ?, section_id = ?,
            offenses = ?, offense_id = ?, level = ?, fine = ?, status = ?,
            official_receipt_number = ?, date_paid = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(record.no)
    .bind(&record.name)
    .bind(&record.plate_number)
    .bind(record.date.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(&record.section)
    .bind(record.section_id.to_string())
    .bind(&record.offenses)
    .bind(record.offense_id.to_string())
    .bind(record.level.as_str())
    .bind(record.fine)
    .bind(record.status.label())
    .bind(record.status.receipt_number())
    .bind(record.status.date_paid().map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(record.updated_at.to_rfc3339())
    .bind(record.id.to_string())
    .bind(record.user_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFoundOrUnauthorized("Record not found".to_string()));
    }
    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM violations WHERE id = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(user_id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFoundOrUnauthorized("Record not found".to_string()));
    }
    Ok(())
}

fn record_from_row(row: &SqliteRow) -> ApiResult<ViolationRecord> {
    let level_text: String = row.get("level");
    let level = match level_text.as_str() {
        "1" => Level::First,
        "2" => Level::Second,
        "3" => Level::Third,
        other => {
            return Err(ApiError::Internal(format!(
                "Corrupt level in database: {}",
                other
            )))
        }
    };

    let status_text: String = row.get("status");
    let receipt: Option<String> = row.get("official_receipt_number");
    let date_paid: Option<String> = row.get("date_paid");
    let status = match (status_text.as_str(), receipt) {
        ("Paid", Some(receipt)) => PaymentStatus::Paid {
            official_receipt_number: receipt,
            date_paid: date_paid
                .as_deref()
                .map(parse_date)
                .transpose()?
                .ok_or_else(|| {
                    ApiError::Internal("Paid record missing date_paid".to_string())
                })?,
        },
        ("Paid", None) => {
            return Err(ApiError::Internal(
                "Paid record missing receipt number".to_string(),
            ))
        }
        ("Pending", _) => PaymentStatus::Pending,
        _ => PaymentStatus::Unpaid,
    };

    let date: Option<String> = row.get("date");

    Ok(ViolationRecord {
        id: parse_uuid(row.get("id"))?,
        no: row.get("no"),
        name: row.get("name"),
        plate_number: row.get("plate_number"),
        date: date.as_deref().map(parse_date).transpose()?,
        section: row.get("section"),
        section_id: parse_uuid(row.get("section_id"))?,
        offenses: row.get("offenses"),
        offense_id: parse_uuid(row.get("offense_id"))?,
        level,
        fine: row.get("fine"),
        status,
        user_id: parse_uuid(row.get("user_id"))?,
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

fn parse_uuid(s: String) -> ApiResult<Uuid> {
    Uuid::parse_str(&s).map_err(|e| ApiError::Internal(format!("Corrupt UUID in database: {}", e)))
}

fn parse_date(s: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| ApiError::Internal(format!("Corrupt date in database: {}", e)))
}

fn parse_timestamp(s: String) -> ApiResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ApiError::Internal(format!("Corrupt timestamp in database: {}", e)))
}
