//! Violation record endpoints
//!
//! Creation takes a whole submission (primary entry plus extras) and plans
//! it against the user's current records before writing. The write loop is
//! per-entry, not transactional: a mid-loop failure leaves earlier entries
//! committed and the response says exactly which entries made it.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{delete, get, post, put};
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use vts_common::events::VtsEvent;
use vts_common::models::{Level, PaymentStatus, ViolationRecord};

use crate::auth::AuthSession;
use crate::classify::batch::{plan_batch, plan_edit, BatchEntry, BatchRequest, PlannedEntry};
use crate::classify::payment::{mark_paid, undo_payment};
use crate::classify::store::ViolationStore;
use crate::classify::ClassifyError;
use crate::db;
use crate::db::violations::ViolationFilter;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/violations", get(list).post(create))
        .route("/api/violations/:id", put(edit).delete(remove))
        .route("/api/violations/:id/pay", post(pay))
        .route("/api/violations/:id/unpay", post(unpay))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub section_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl From<ListQuery> for ViolationFilter {
    fn from(q: ListQuery) -> Self {
        ViolationFilter {
            search: q.search,
            status: q.status,
            section_id: q.section_id,
            date_from: q.date_from,
            date_to: q.date_to,
        }
    }
}

async fn list(
    State(state): State<AppState>,
    session: AuthSession,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<ViolationRecord>>> {
    let records =
        db::violations::fetch_filtered(&state.db, session.user_id, &query.into()).await?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryBody {
    section_id: Uuid,
    offense_id: Uuid,
    level: Option<Level>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody {
    no: i64,
    name: String,
    plate_number: String,
    date: Option<NaiveDate>,
    entries: Vec<EntryBody>,
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    added: usize,
    records: Vec<ViolationRecord>,
    errors: Vec<String>,
}

/// Section and offense display names, keyed by id, for denormalizing onto
/// records at write time.
struct CatalogNames {
    sections: HashMap<Uuid, String>,
    offenses: HashMap<Uuid, String>,
}

impl CatalogNames {
    async fn load(state: &AppState) -> ApiResult<Self> {
        let sections = db::catalog::fetch_sections(&state.db)
            .await?
            .into_iter()
            .map(|s| (s.id, s.section_name))
            .collect();
        let offenses = db::catalog::fetch_offenses(&state.db)
            .await?
            .into_iter()
            .map(|o| (o.id, o.offense_name))
            .collect();
        Ok(CatalogNames { sections, offenses })
    }

    fn entry(&self, body: &EntryBody) -> ApiResult<BatchEntry> {
        let section_name = self
            .sections
            .get(&body.section_id)
            .ok_or_else(|| ApiError::Validation("Unknown section".to_string()))?;
        let offense_name = self
            .offenses
            .get(&body.offense_id)
            .ok_or_else(|| ApiError::Validation("Unknown offense".to_string()))?;
        Ok(BatchEntry {
            section_id: body.section_id,
            section_name: section_name.clone(),
            offense_id: body.offense_id,
            offense_name: offense_name.clone(),
            level: body.level,
        })
    }
}

fn batch_request(body: &SubmitBody, names: &CatalogNames) -> ApiResult<BatchRequest> {
    let entries = body
        .entries
        .iter()
        .map(|e| names.entry(e))
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(BatchRequest {
        no: body.no,
        name: body.name.trim().to_string(),
        plate_number: body.plate_number.trim().to_uppercase(),
        date: body.date,
        entries,
    })
}

fn record_from_planned(
    planned: &PlannedEntry,
    request: &BatchRequest,
    fine: f64,
    user_id: Uuid,
) -> ViolationRecord {
    let now = Utc::now();
    ViolationRecord {
        id: Uuid::new_v4(),
        no: request.no,
        name: request.name.clone(),
        plate_number: request.plate_number.clone(),
        date: request.date,
        section: planned.section_name.clone(),
        section_id: planned.section_id,
        offenses: planned.offense_name.clone(),
        offense_id: planned.offense_id,
        level: planned.level,
        fine,
        status: PaymentStatus::Unpaid,
        user_id,
        created_at: now,
        updated_at: now,
    }
}

async fn create(
    State(state): State<AppState>,
    session: AuthSession,
    Json(body): Json<SubmitBody>,
) -> ApiResult<Json<SubmitResponse>> {
    let names = CatalogNames::load(&state).await?;
    let request = batch_request(&body, &names)?;

    let rows = db::violations::fetch_all_for_user(&state.db, session.user_id).await?;
    let store = ViolationStore::from_rows(rows);

    let planned = plan_batch(&store, &request, Utc::now().date_naive())?;

    let mut records = Vec::new();
    let mut errors = Vec::new();

    for entry in &planned {
        let fine = match db::catalog::fine_amount(&state.db, entry.offense_id, entry.level).await {
            Ok(Some(amount)) => amount,
            Ok(None) => {
                errors.push(
                    ClassifyError::FineScheduleMissing {
                        offense: entry.offense_name.clone(),
                        level: entry.level,
                    }
                    .to_string(),
                );
                break;
            }
            Err(err) => {
                errors.push(err.to_string());
                break;
            }
        };

        let record = record_from_planned(entry, &request, fine, session.user_id);
        match db::violations::insert(&state.db, &record).await {
            Ok(()) => records.push(record),
            Err(err) => {
                errors.push(format!("{}: {}", entry.offense_name, err));
                break;
            }
        }
    }

    if !records.is_empty() {
        state
            .event_bus
            .emit(VtsEvent::violations_changed(session.user_id));
    }

    info!(
        added = records.len(),
        failed = errors.len(),
        "Violation submission for no. {}",
        request.no
    );

    Ok(Json(SubmitResponse {
        added: records.len(),
        records,
        errors,
    }))
}

async fn edit(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitBody>,
) -> ApiResult<Json<ViolationRecord>> {
    let existing = db::violations::fetch_one(&state.db, id, session.user_id).await?;

    let names = CatalogNames::load(&state).await?;
    let request = batch_request(&body, &names)?;

    let rows = db::violations::fetch_all_for_user(&state.db, session.user_id).await?;
    let store = ViolationStore::from_rows(rows);

    let planned = plan_edit(&store, &request, id, Utc::now().date_naive())?;

    let fine = db::catalog::fine_amount(&state.db, planned.offense_id, planned.level)
        .await?
        .ok_or(ClassifyError::FineScheduleMissing {
            offense: planned.offense_name.clone(),
            level: planned.level,
        })?;

    // Payment state is never touched through this path.
    let updated = ViolationRecord {
        no: request.no,
        name: request.name.clone(),
        plate_number: request.plate_number.clone(),
        date: request.date,
        section: planned.section_name.clone(),
        section_id: planned.section_id,
        offenses: planned.offense_name.clone(),
        offense_id: planned.offense_id,
        level: planned.level,
        fine,
        updated_at: Utc::now(),
        ..existing
    };

    db::violations::update(&state.db, &updated).await?;
    state
        .event_bus
        .emit(VtsEvent::violations_changed(session.user_id));

    Ok(Json(updated))
}

async fn remove(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    db::violations::delete(&state.db, id, session.user_id).await?;
    state
        .event_bus
        .emit(VtsEvent::violations_changed(session.user_id));
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayBody {
    official_receipt_number: String,
    date_paid: Option<NaiveDate>,
}

async fn pay(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
    Json(body): Json<PayBody>,
) -> ApiResult<Json<ViolationRecord>> {
    let rows = db::violations::fetch_all_for_user(&state.db, session.user_id).await?;
    let store = ViolationStore::from_rows(rows);
    let record = store
        .find_by_id(id)
        .ok_or_else(|| ApiError::NotFoundOrUnauthorized("Record not found".to_string()))?;

    let updated = mark_paid(
        &store,
        record,
        &body.official_receipt_number,
        body.date_paid,
        Utc::now().date_naive(),
    )?;

    db::violations::update(&state.db, &updated).await?;
    state
        .event_bus
        .emit(VtsEvent::violations_changed(session.user_id));

    Ok(Json(updated))
}

async fn unpay(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ViolationRecord>> {
    let record = db::violations::fetch_one(&state.db, id, session.user_id).await?;

    let updated = undo_payment(&record);
    db::violations::update(&state.db, &updated).await?;
    state
        .event_bus
        .emit(VtsEvent::violations_changed(session.user_id));

    Ok(Json(updated))
}
