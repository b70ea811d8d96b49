//! Spreadsheet import and export endpoints
//!
//! Import is row-by-row: a bad row is reported and skipped, good rows land.
//! Export honors the same filters as the list endpoint and downloads as a
//! CSV attachment.

use std::collections::HashSet;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use vts_common::events::VtsEvent;

use crate::auth::AuthSession;
use crate::classify::store::ViolationStore;
use crate::db;
use crate::error::ApiResult;
use crate::transfer::export::write_csv;
use crate::transfer::import::{build_record, resolve_row, CatalogIndex, ImportRow};
use crate::AppState;

use super::violations::ListQuery;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/violations/export", get(export))
        .route("/api/violations/import", post(import))
}

async fn export(
    State(state): State<AppState>,
    session: AuthSession,
    Query(query): Query<ListQuery>,
) -> ApiResult<Response> {
    let records =
        db::violations::fetch_filtered(&state.db, session.user_id, &query.into()).await?;
    let csv = write_csv(&records)?;

    let filename = format!("violations-{}.csv", Utc::now().date_naive().format("%Y-%m-%d"));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    )
        .into_response())
}

#[derive(Debug, Serialize)]
struct ImportResponse {
    imported: usize,
    errors: Vec<String>,
}

async fn import(
    State(state): State<AppState>,
    session: AuthSession,
    body: String,
) -> ApiResult<Json<ImportResponse>> {
    let sections = db::catalog::fetch_sections(&state.db).await?;
    let offenses = db::catalog::fetch_offenses(&state.db).await?;
    let index = CatalogIndex::build(&sections, &offenses);

    let rows = db::violations::fetch_all_for_user(&state.db, session.user_id).await?;
    let mut store = ViolationStore::from_rows(rows);
    let mut used_nos: HashSet<i64> = store.snapshot().iter().map(|r| r.no).collect();

    let mut imported = 0usize;
    let mut errors = Vec::new();
    let today = Utc::now().date_naive();

    let mut reader = csv::Reader::from_reader(body.as_bytes());
    for (idx, row) in reader.deserialize::<ImportRow>().enumerate() {
        // Header is row 1; first data row is row 2.
        let row_no = idx + 2;

        let row = match row {
            Ok(row) => row,
            Err(err) => {
                errors.push(format!("Row {}: unreadable row ({})", row_no, err));
                continue;
            }
        };

        let resolved = match resolve_row(&row, &index, &used_nos) {
            Ok(resolved) => resolved,
            Err(err) => {
                errors.push(format!("Row {}: {}", row_no, err));
                continue;
            }
        };

        let scheduled_fine = match resolved.fine_override {
            Some(_) => None,
            None => {
                db::catalog::fine_amount(&state.db, resolved.offense_id, resolved.level).await?
            }
        };

        let record = match build_record(&resolved, scheduled_fine, &store, session.user_id, today) {
            Ok(record) => record,
            Err(err) => {
                errors.push(format!("Row {}: {}", row_no, err));
                continue;
            }
        };

        if record.status.date_paid().map_or(false, |d| d > today) {
            errors.push(format!("Row {}: Date Paid cannot be in the future", row_no));
            continue;
        }

        match db::violations::insert(&state.db, &record).await {
            Ok(()) => {
                used_nos.insert(record.no);
                store.apply_create(record);
                imported += 1;
            }
            Err(err) => errors.push(format!("Row {}: {}", row_no, err)),
        }
    }

    if imported > 0 {
        state
            .event_bus
            .emit(VtsEvent::violations_changed(session.user_id));
    }

    info!(imported, failed = errors.len(), "Spreadsheet import finished");
    Ok(Json(ImportResponse { imported, errors }))
}
