//! Violation tracking service
//!
//! Record-keeping backend for traffic citations: progressive offense-level
//! classification, duplicate guards, payment tracking against official
//! receipts, a section/offense/fine catalog, and spreadsheet import/export,
//! all behind a token-authenticated REST API with SSE change notifications.

pub mod api;
pub mod auth;
pub mod classify;
pub mod db;
pub mod error;
pub mod transfer;

use std::time::Instant;

use sqlx::SqlitePool;
use vts_common::events::EventBus;

pub use api::build_router;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub event_bus: EventBus,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        AppState {
            db,
            event_bus,
            started_at: Instant::now(),
        }
    }
}
