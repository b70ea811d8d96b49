//! Catalog endpoints: sections, offenses, and the fine schedule

use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use vts_common::events::VtsEvent;
use vts_common::models::{FineRate, Level, Offense, Section};

use crate::auth::AuthSession;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/catalog/sections", get(list_sections).post(create_section))
        .route(
            "/api/catalog/sections/:id",
            put(rename_section).delete(delete_section),
        )
        .route("/api/catalog/sections/:id/offenses", get(list_section_offenses))
        .route("/api/catalog/offenses", get(list_offenses).post(create_offense))
        .route(
            "/api/catalog/offenses/:id",
            put(rename_offense).delete(delete_offense),
        )
        .route(
            "/api/catalog/offenses/:id/fines",
            get(list_fines).put(set_fine),
        )
        .route("/api/catalog/seed", post(seed))
}

async fn list_sections(
    State(state): State<AppState>,
    _session: AuthSession,
) -> ApiResult<Json<Vec<Section>>> {
    Ok(Json(db::catalog::fetch_sections(&state.db).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SectionBody {
    section_name: String,
}

async fn create_section(
    State(state): State<AppState>,
    _session: AuthSession,
    Json(body): Json<SectionBody>,
) -> ApiResult<Json<Section>> {
    let name = require_name(&body.section_name, "Section name")?;
    let section = db::catalog::create_section(&state.db, name).await?;
    state.event_bus.emit(VtsEvent::sections_changed());
    Ok(Json(section))
}

async fn rename_section(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<Uuid>,
    Json(body): Json<SectionBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let name = require_name(&body.section_name, "Section name")?;
    db::catalog::rename_section(&state.db, id, name).await?;
    state.event_bus.emit(VtsEvent::sections_changed());
    Ok(Json(json!({ "success": true })))
}

/// Deleting a section cascades to its offenses and fines. Existing
/// violation records keep their captured display names.
async fn delete_section(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    db::catalog::delete_section(&state.db, id).await?;
    state.event_bus.emit(VtsEvent::sections_changed());
    state.event_bus.emit(VtsEvent::offenses_changed());
    Ok(Json(json!({ "success": true })))
}

async fn list_section_offenses(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Offense>>> {
    Ok(Json(
        db::catalog::fetch_offenses_by_section(&state.db, id).await?,
    ))
}

async fn list_offenses(
    State(state): State<AppState>,
    _session: AuthSession,
) -> ApiResult<Json<Vec<Offense>>> {
    Ok(Json(db::catalog::fetch_offenses(&state.db).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOffenseBody {
    section_id: Uuid,
    offense_name: String,
}

async fn create_offense(
    State(state): State<AppState>,
    _session: AuthSession,
    Json(body): Json<CreateOffenseBody>,
) -> ApiResult<Json<Offense>> {
    let name = require_name(&body.offense_name, "Offense name")?;
    let offense = db::catalog::create_offense(&state.db, body.section_id, name).await?;
    state.event_bus.emit(VtsEvent::offenses_changed());
    Ok(Json(offense))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameOffenseBody {
    offense_name: String,
}

async fn rename_offense(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<Uuid>,
    Json(body): Json<RenameOffenseBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let name = require_name(&body.offense_name, "Offense name")?;
    db::catalog::rename_offense(&state.db, id, name).await?;
    state.event_bus.emit(VtsEvent::offenses_changed());
    Ok(Json(json!({ "success": true })))
}

async fn delete_offense(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    db::catalog::delete_offense(&state.db, id).await?;
    state.event_bus.emit(VtsEvent::offenses_changed());
    state.event_bus.emit(VtsEvent::fines_changed());
    Ok(Json(json!({ "success": true })))
}

async fn list_fines(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<FineRate>>> {
    Ok(Json(db::catalog::fetch_fines_by_offense(&state.db, id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FineBody {
    level: Level,
    amount: f64,
}

async fn set_fine(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<Uuid>,
    Json(body): Json<FineBody>,
) -> ApiResult<Json<serde_json::Value>> {
    if body.amount < 0.0 {
        return Err(ApiError::Validation(
            "Fine amount cannot be negative".to_string(),
        ));
    }
    db::catalog::upsert_fine(&state.db, id, body.level, body.amount).await?;
    state.event_bus.emit(VtsEvent::fines_changed());
    Ok(Json(json!({ "success": true })))
}

/// Populate the default sections, offenses, and fine schedule. Idempotent.
async fn seed(
    State(state): State<AppState>,
    _session: AuthSession,
) -> ApiResult<Json<serde_json::Value>> {
    let summary = db::catalog::seed_catalog(&state.db).await?;
    info!(
        sections = summary.sections,
        offenses = summary.offenses,
        fines = summary.fines,
        "Catalog seeded"
    );
    state.event_bus.emit(VtsEvent::sections_changed());
    state.event_bus.emit(VtsEvent::offenses_changed());
    state.event_bus.emit(VtsEvent::fines_changed());
    Ok(Json(json!({ "success": true, "seeded": summary })))
}

fn require_name<'a>(value: &'a str, label: &str) -> ApiResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(format!("{} is required", label)));
    }
    Ok(trimmed)
}
