//! Server-Sent Events endpoint
//!
//! One stream per session. Table-change notifications are coalesced over a
//! short window so a batch submission produces one `TableChanged` event per
//! table instead of one per row. The flush is bounded: a sustained event
//! stream cannot defer it past a fixed maximum delay. A lagged subscriber
//! is told every table changed and refetches everything.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::stream::Stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::auth::AuthSession;
use crate::AppState;

const COALESCE_WINDOW: Duration = Duration::from_millis(250);
const MAX_COALESCE_DELAY: Duration = Duration::from_secs(1);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

const ALL_TABLES: [&str; 4] = ["violations", "sections", "offenses", "fines"];

/// Pending table notifications awaiting a flush.
///
/// The flush deadline is anchored to the oldest pending entry, so each new
/// event shortens the remaining wait instead of restarting the window.
struct Coalescer {
    pending: BTreeSet<&'static str>,
    first_at: Option<Instant>,
}

impl Coalescer {
    fn new() -> Self {
        Coalescer {
            pending: BTreeSet::new(),
            first_at: None,
        }
    }

    fn note(&mut self, table: &'static str, now: Instant) {
        self.pending.insert(table);
        self.first_at.get_or_insert(now);
    }

    fn note_all(&mut self, now: Instant) {
        for table in ALL_TABLES {
            self.note(table, now);
        }
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// How long to wait for the next event before flushing.
    fn wait(&self, now: Instant) -> Duration {
        match self.first_at {
            None => HEARTBEAT_INTERVAL,
            Some(first) => {
                COALESCE_WINDOW.min(MAX_COALESCE_DELAY.saturating_sub(now.duration_since(first)))
            }
        }
    }

    /// Whether the oldest pending entry has waited out the maximum delay.
    fn due(&self, now: Instant) -> bool {
        self.first_at
            .map_or(false, |first| now.duration_since(first) >= MAX_COALESCE_DELAY)
    }

    fn take(&mut self) -> BTreeSet<&'static str> {
        self.first_at = None;
        std::mem::take(&mut self.pending)
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/events", get(event_stream))
}

async fn event_stream(
    State(state): State<AppState>,
    session: AuthSession,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client for user {}", session.user_id);

    let mut rx = state.event_bus.subscribe();
    let user_id = session.user_id;

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("ConnectionStatus").data("connected"));

        let mut coalescer = Coalescer::new();

        loop {
            let wait = coalescer.wait(Instant::now());

            match tokio::time::timeout(wait, rx.recv()).await {
                Ok(Ok(event)) => {
                    if event.visible_to(user_id) {
                        coalescer.note(event.table(), Instant::now());
                    }
                    // A saturated bus keeps recv ready, so the timeout may
                    // never fire; flush here once the deadline has passed.
                    if coalescer.due(Instant::now()) {
                        for table in coalescer.take() {
                            yield Ok(Event::default().event("TableChanged").data(table));
                        }
                    }
                }
                Ok(Err(RecvError::Lagged(skipped))) => {
                    debug!("SSE subscriber lagged, skipped {} events", skipped);
                    coalescer.note_all(Instant::now());
                }
                Ok(Err(RecvError::Closed)) => break,
                Err(_) => {
                    if coalescer.is_empty() {
                        yield Ok(Event::default().comment("heartbeat"));
                    } else {
                        for table in coalescer.take() {
                            yield Ok(Event::default().event("TableChanged").data(table));
                        }
                    }
                }
            }
        }

        for table in coalescer.take() {
            yield Ok(Event::default().event("TableChanged").data(table));
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
