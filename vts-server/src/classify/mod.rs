//! Progressive violation classifier
//!
//! The pure business logic of the service: computing the next offense level
//! for a subject, guarding against duplicate entries and number collisions,
//! planning multi-entry batch submissions, and the payment transitions.
//! Nothing in this module touches the database — callers supply a
//! [`store::ViolationStore`] snapshot and apply the results.

pub mod batch;
pub mod guard;
pub mod level;
pub mod payment;
pub mod store;
pub mod validate;

#[cfg(test)]
pub(crate) mod testutil;

pub use batch::{plan_batch, plan_edit, BatchEntry, BatchRequest, PlannedEntry};
pub use guard::{find_exact_duplicate, find_number_collision, DuplicateProbe};
pub use level::{resolve_level, HistoryEntry, LevelCandidate};
pub use store::ViolationStore;

use thiserror::Error;
use vts_common::models::Level;

/// Errors from the pure classification layer.
///
/// These carry enough structure for the API layer to map each one to a
/// distinct user-facing error kind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifyError {
    #[error("{0}")]
    Validation(String),

    #[error("Number {no} is already assigned to violation #{existing_no}. Please use a different number.")]
    NumberCollision { no: i64, existing_no: i64 },

    #[error("Duplicate found for offense \"{offense}\" (existing violation #{existing_no}).")]
    ExactDuplicate { offense: String, existing_no: i64 },

    #[error("Official Receipt Number {receipt} is already used for violation #{existing_no}")]
    ReceiptAlreadyUsed { receipt: String, existing_no: i64 },

    #[error("{label} is ambiguous: \"{input}\". Please use a more specific value.")]
    AmbiguousMatch { label: String, input: String },

    #[error("No fine schedule found for \"{offense}\" at level {level}")]
    FineScheduleMissing { offense: String, level: Level },
}
