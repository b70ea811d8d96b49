//! Duplicate and conflict guard
//!
//! Two independent pre-write checks. A number collision means another record
//! already holds the requested sequence number; an exact duplicate means a
//! record identical in plate, name, offense display name, section, date, and
//! level already exists. Both always block the write.

use chrono::NaiveDate;
use uuid::Uuid;
use vts_common::models::{Level, ViolationRecord};

use super::level::normalize_plate;
use super::store::ViolationStore;

/// Candidate fields checked by the exact-duplicate guard.
#[derive(Debug, Clone)]
pub struct DuplicateProbe<'a> {
    pub plate_number: &'a str,
    /// Compared raw, not trimmed — a deliberately stricter match than the
    /// resolver's so near-identical names never silently merge.
    pub name: &'a str,
    pub offense_name: &'a str,
    pub section_id: Uuid,
    pub date: Option<NaiveDate>,
    pub level: Level,
}

/// Any record with the same `no` and a different identity.
pub fn find_number_collision(
    store: &ViolationStore,
    no: i64,
    exclude_id: Option<Uuid>,
) -> Option<&ViolationRecord> {
    store
        .snapshot()
        .iter()
        .find(|record| record.no == no && Some(record.id) != exclude_id)
}

/// A record matching the probe on every field, other than `exclude_id`.
pub fn find_exact_duplicate<'s>(
    store: &'s ViolationStore,
    probe: &DuplicateProbe<'_>,
    exclude_id: Option<Uuid>,
) -> Option<&'s ViolationRecord> {
    let plate = normalize_plate(probe.plate_number);
    store.snapshot().iter().find(|record| {
        normalize_plate(&record.plate_number) == plate
            && record.name == probe.name
            && record.offenses == probe.offense_name
            && record.section_id == probe.section_id
            && record.date == probe.date
            && record.level == probe.level
            && Some(record.id) != exclude_id
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::testutil::record;

    #[test]
    fn number_collision_found_and_excluded() {
        let existing = record(5, "Juan", "ABC-123", Level::First);
        let existing_id = existing.id;
        let store = ViolationStore::from_rows(vec![existing]);

        assert!(find_number_collision(&store, 5, None).is_some());
        assert!(find_number_collision(&store, 6, None).is_none());
        // Editing record 5 itself keeps its own number.
        assert!(find_number_collision(&store, 5, Some(existing_id)).is_none());
    }

    fn probe_for(record: &ViolationRecord) -> DuplicateProbe<'_> {
        DuplicateProbe {
            plate_number: &record.plate_number,
            name: &record.name,
            offense_name: &record.offenses,
            section_id: record.section_id,
            date: record.date,
            level: record.level,
        }
    }

    #[test]
    fn exact_duplicate_matches_all_fields() {
        let existing = record(1, "Juan", "ABC-123", Level::First);
        let store = ViolationStore::from_rows(vec![existing.clone()]);

        assert!(find_exact_duplicate(&store, &probe_for(&existing), None).is_some());
    }

    #[test]
    fn plate_comparison_is_normalized() {
        let existing = record(1, "Juan", "ABC-123", Level::First);
        let store = ViolationStore::from_rows(vec![existing.clone()]);

        let mut probe = probe_for(&existing);
        probe.plate_number = " abc-123 ";
        assert!(find_exact_duplicate(&store, &probe, None).is_some());
    }

    #[test]
    fn any_differing_field_is_not_a_duplicate() {
        let existing = record(1, "Juan", "ABC-123", Level::First);
        let store = ViolationStore::from_rows(vec![existing.clone()]);

        let mut other_level = probe_for(&existing);
        other_level.level = Level::Second;
        assert!(find_exact_duplicate(&store, &other_level, None).is_none());

        let mut other_date = probe_for(&existing);
        other_date.date = NaiveDate::from_ymd_opt(2026, 1, 1);
        assert!(find_exact_duplicate(&store, &other_date, None).is_none());

        let mut other_offense = probe_for(&existing);
        other_offense.offense_name = "No Seatbelt";
        assert!(find_exact_duplicate(&store, &other_offense, None).is_none());
    }

    #[test]
    fn exclude_id_permits_updating_the_same_record() {
        let existing = record(1, "Juan", "ABC-123", Level::First);
        let id = existing.id;
        let store = ViolationStore::from_rows(vec![existing.clone()]);

        assert!(find_exact_duplicate(&store, &probe_for(&existing), Some(id)).is_none());
    }
}
