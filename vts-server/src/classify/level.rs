//! Offense-level resolver
//!
//! Assigns the progressive offense level (1st/2nd/3rd) for a candidate
//! citation by scanning the subject's prior matching violations. Matching is
//! exact on (name, plate, section, offense) after normalization: names are
//! trimmed, plates are upper-cased and trimmed. Levels cap at 3 — a repeat
//! offense beyond the third is still recorded at level 3.

use uuid::Uuid;
use vts_common::models::{Level, ViolationRecord};

/// One prior violation as seen by the resolver.
///
/// `id` is `None` for synthetic entries appended mid-batch (earlier entries
/// of the same submission acting as history for later ones).
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: Option<Uuid>,
    pub name: String,
    pub plate_number: String,
    pub section_id: Uuid,
    pub offense_id: Uuid,
    pub level: Level,
}

impl From<&ViolationRecord> for HistoryEntry {
    fn from(record: &ViolationRecord) -> Self {
        HistoryEntry {
            id: Some(record.id),
            name: record.name.clone(),
            plate_number: record.plate_number.clone(),
            section_id: record.section_id,
            offense_id: record.offense_id,
            level: record.level,
        }
    }
}

/// The citation being classified.
#[derive(Debug, Clone, Copy)]
pub struct LevelCandidate<'a> {
    pub name: &'a str,
    pub plate_number: &'a str,
    pub section_id: Option<Uuid>,
    pub offense_id: Option<Uuid>,
}

/// Compute the next progressive level for `candidate` against `history`.
///
/// Returns level 1 whenever the subject identity cannot be established
/// (empty name or plate, missing section or offense). Otherwise returns
/// one past the highest matching prior level, capped at 3. Pure: the same
/// inputs always yield the same level.
pub fn resolve_level(
    history: &[HistoryEntry],
    candidate: &LevelCandidate<'_>,
    exclude_id: Option<Uuid>,
) -> Level {
    let name = candidate.name.trim();
    let plate = normalize_plate(candidate.plate_number);
    let (section_id, offense_id) = match (candidate.section_id, candidate.offense_id) {
        (Some(s), Some(o)) => (s, o),
        _ => return Level::First,
    };
    if name.is_empty() || plate.is_empty() {
        return Level::First;
    }

    let max_level = history
        .iter()
        .filter(|entry| {
            entry.name.trim() == name
                && normalize_plate(&entry.plate_number) == plate
                && entry.section_id == section_id
                && entry.offense_id == offense_id
                && (exclude_id.is_none() || entry.id != exclude_id)
        })
        .map(|entry| entry.level)
        .max();

    Level::after(max_level)
}

/// Plate normalization used everywhere plates are compared.
pub fn normalize_plate(plate: &str) -> String {
    plate.trim().to_uppercase()
}
