//! Batch submission coordinator (planning half)
//!
//! One form submission carries a primary entry plus zero or more additional
//! entries sharing subject and date. Levels are assigned sequentially over a
//! mutable history seeded from the store snapshot, so later entries in the
//! same batch see earlier ones as prior history — filing a 1st-then-2nd
//! offense for the same plate and offense in one submission works.
//!
//! Planning is pure and all-or-nothing: number collisions and exact
//! duplicates are checked against the real store before the caller writes
//! anything. The write loop itself (fine lookup + insert per entry) lives in
//! the API layer and is not transactional; a mid-loop failure leaves prior
//! entries committed and is reported as such.

use chrono::NaiveDate;
use uuid::Uuid;
use vts_common::models::Level;

use super::guard::{find_exact_duplicate, find_number_collision, DuplicateProbe};
use super::level::{resolve_level, HistoryEntry, LevelCandidate};
use super::store::ViolationStore;
use super::validate::validate_violation_date;
use super::ClassifyError;

/// One section/offense selection within a submission.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub section_id: Uuid,
    pub section_name: String,
    pub offense_id: Uuid,
    pub offense_name: String,
    /// Caller-proposed level. Only edit mode honors it; create mode always
    /// asks the resolver, which pins level 1 for an incomplete identity.
    pub level: Option<Level>,
}

/// A full submission: shared subject fields plus entries, primary first.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub no: i64,
    pub name: String,
    pub plate_number: String,
    pub date: Option<NaiveDate>,
    pub entries: Vec<BatchEntry>,
}

/// An entry with its level resolved, ready for fine lookup and insert.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedEntry {
    pub section_id: Uuid,
    pub section_name: String,
    pub offense_id: Uuid,
    pub offense_name: String,
    pub level: Level,
}

/// Plan a create-mode batch: validate, assign levels with history chaining,
/// then run both guards against the real store. No side effects.
pub fn plan_batch(
    store: &ViolationStore,
    request: &BatchRequest,
    today: NaiveDate,
) -> Result<Vec<PlannedEntry>, ClassifyError> {
    validate_request(request, today)?;

    let name = request.name.trim();
    let plate = request.plate_number.trim();

    let mut history = store.history();
    let mut planned = Vec::with_capacity(request.entries.len());

    for entry in &request.entries {
        let level = resolve_level(
            &history,
            &LevelCandidate {
                name,
                plate_number: plate,
                section_id: Some(entry.section_id),
                offense_id: Some(entry.offense_id),
            },
            None,
        );

        // Later entries in this batch must see this one as prior history.
        history.push(HistoryEntry {
            id: None,
            name: name.to_string(),
            plate_number: plate.to_string(),
            section_id: entry.section_id,
            offense_id: entry.offense_id,
            level,
        });

        planned.push(PlannedEntry {
            section_id: entry.section_id,
            section_name: entry.section_name.clone(),
            offense_id: entry.offense_id,
            offense_name: entry.offense_name.clone(),
            level,
        });
    }

    check_collision(store, request.no, None)?;
    for entry in &planned {
        check_duplicate(store, request, entry, None)?;
    }

    Ok(planned)
}

/// Plan an edit of an existing record. Edit mode permits only the single
/// primary entry and never recomputes the level — the caller supplies it.
pub fn plan_edit(
    store: &ViolationStore,
    request: &BatchRequest,
    edit_id: Uuid,
    today: NaiveDate,
) -> Result<PlannedEntry, ClassifyError> {
    validate_request(request, today)?;
    if request.entries.len() != 1 {
        return Err(ClassifyError::Validation(
            "Editing a violation accepts a single entry".to_string(),
        ));
    }

    let entry = &request.entries[0];
    let level = entry.level.ok_or_else(|| {
        ClassifyError::Validation("Valid offense level is required".to_string())
    })?;

    let planned = PlannedEntry {
        section_id: entry.section_id,
        section_name: entry.section_name.clone(),
        offense_id: entry.offense_id,
        offense_name: entry.offense_name.clone(),
        level,
    };

    check_collision(store, request.no, Some(edit_id))?;
    check_duplicate(store, request, &planned, Some(edit_id))?;

    Ok(planned)
}

fn validate_request(request: &BatchRequest, today: NaiveDate) -> Result<(), ClassifyError> {
    if request.no <= 0 {
        return Err(ClassifyError::Validation(
            "Invalid violation number".to_string(),
        ));
    }
    if request.entries.is_empty() {
        return Err(ClassifyError::Validation(
            "At least one offense entry is required".to_string(),
        ));
    }
    validate_violation_date(request.date, today)
}

fn check_collision(
    store: &ViolationStore,
    no: i64,
    exclude_id: Option<Uuid>,
) -> Result<(), ClassifyError> {
    if let Some(existing) = find_number_collision(store, no, exclude_id) {
        return Err(ClassifyError::NumberCollision {
            no,
            existing_no: existing.no,
        });
    }
    Ok(())
}

fn check_duplicate(
    store: &ViolationStore,
    request: &BatchRequest,
    entry: &PlannedEntry,
    exclude_id: Option<Uuid>,
) -> Result<(), ClassifyError> {
    let probe = DuplicateProbe {
        plate_number: &request.plate_number,
        name: &request.name,
        offense_name: &entry.offense_name,
        section_id: entry.section_id,
        date: request.date,
        level: entry.level,
    };
    if let Some(existing) = find_exact_duplicate(store, &probe, exclude_id) {
        return Err(ClassifyError::ExactDuplicate {
            offense: entry.offense_name.clone(),
            existing_no: existing.no,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::testutil::{record, record_for};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 27).unwrap()
    }

    fn entry(section_id: Uuid, offense_id: Uuid) -> BatchEntry {
        BatchEntry {
            section_id,
            section_name: "Seatbelt and Helmet (Section 70)".to_string(),
            offense_id,
            offense_name: "No Helmet".to_string(),
            level: None,
        }
    }

    fn request(no: i64, entries: Vec<BatchEntry>) -> BatchRequest {
        BatchRequest {
            no,
            name: "Juan Dela Cruz".to_string(),
            plate_number: "ABC-1234".to_string(),
            date: None,
            entries,
        }
    }

    #[test]
    fn two_entries_for_same_offense_chain_first_then_second() {
        let (s, o) = (Uuid::new_v4(), Uuid::new_v4());
        let store = ViolationStore::new();
        let req = request(1, vec![entry(s, o), entry(s, o)]);

        let planned = plan_batch(&store, &req, today()).unwrap();
        assert_eq!(planned[0].level, Level::First);
        assert_eq!(planned[1].level, Level::Second);
    }

    #[test]
    fn entries_for_different_offenses_each_start_at_first() {
        let s = Uuid::new_v4();
        let store = ViolationStore::new();
        let req = request(1, vec![entry(s, Uuid::new_v4()), entry(s, Uuid::new_v4())]);

        let planned = plan_batch(&store, &req, today()).unwrap();
        assert_eq!(planned[0].level, Level::First);
        assert_eq!(planned[1].level, Level::First);
    }

    #[test]
    fn prior_store_history_advances_the_batch() {
        let (s, o) = (Uuid::new_v4(), Uuid::new_v4());
        let prior = record_for(9, "Juan Dela Cruz", "ABC-1234", s, o, Level::First);
        let store = ViolationStore::from_rows(vec![prior]);
        let req = request(1, vec![entry(s, o)]);

        let planned = plan_batch(&store, &req, today()).unwrap();
        assert_eq!(planned[0].level, Level::Second);
    }

    #[test]
    fn number_collision_aborts_before_any_write() {
        let existing = record(5, "Someone Else", "XYZ-999", Level::First);
        let store = ViolationStore::from_rows(vec![existing]);
        let req = request(5, vec![entry(Uuid::new_v4(), Uuid::new_v4())]);

        let err = plan_batch(&store, &req, today()).unwrap_err();
        assert!(matches!(err, ClassifyError::NumberCollision { no: 5, .. }));
    }

    #[test]
    fn capped_level_resubmission_is_an_exact_duplicate() {
        // With levels 1..3 on record, the resolver assigns 3 again; same
        // offense and date makes the new entry an exact duplicate of the
        // existing level-3 record.
        let (s, o) = (Uuid::new_v4(), Uuid::new_v4());
        let rows = [Level::First, Level::Second, Level::Third]
            .iter()
            .enumerate()
            .map(|(i, level)| record_for(i as i64 + 1, "Juan Dela Cruz", "ABC-1234", s, o, *level))
            .collect();
        let store = ViolationStore::from_rows(rows);

        let err = plan_batch(&store, &request(8, vec![entry(s, o)]), today()).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::ExactDuplicate { existing_no: 3, .. }
        ));
    }

    #[test]
    fn invalid_number_and_empty_entries_are_rejected() {
        let store = ViolationStore::new();
        let err = plan_batch(&store, &request(0, vec![entry(Uuid::new_v4(), Uuid::new_v4())]), today())
            .unwrap_err();
        assert!(matches!(err, ClassifyError::Validation(_)));

        let err = plan_batch(&store, &request(1, vec![]), today()).unwrap_err();
        assert!(matches!(err, ClassifyError::Validation(_)));
    }

    #[test]
    fn future_date_is_rejected() {
        let store = ViolationStore::new();
        let mut req = request(1, vec![entry(Uuid::new_v4(), Uuid::new_v4())]);
        req.date = today().succ_opt();

        let err = plan_batch(&store, &req, today()).unwrap_err();
        assert!(matches!(err, ClassifyError::Validation(_)));
    }

    #[test]
    fn incomplete_identity_pins_level_one_regardless_of_caller_level() {
        let store = ViolationStore::new();
        let mut req = request(1, vec![entry(Uuid::new_v4(), Uuid::new_v4())]);
        req.name = String::new();
        req.entries[0].level = Some(Level::Third);

        let planned = plan_batch(&store, &req, today()).unwrap();
        assert_eq!(planned[0].level, Level::First);
    }

    #[test]
    fn caller_level_never_overrides_the_resolver_in_create_mode() {
        let store = ViolationStore::new();
        let mut req = request(1, vec![entry(Uuid::new_v4(), Uuid::new_v4())]);
        req.entries[0].level = Some(Level::Third);

        let planned = plan_batch(&store, &req, today()).unwrap();
        assert_eq!(planned[0].level, Level::First);
    }

    #[test]
    fn edit_keeps_own_number_and_requires_single_entry() {
        let (s, o) = (Uuid::new_v4(), Uuid::new_v4());
        let existing = record_for(5, "Juan Dela Cruz", "ABC-1234", s, o, Level::First);
        let edit_id = existing.id;
        let store = ViolationStore::from_rows(vec![existing]);

        let mut req = request(5, vec![entry(s, o)]);
        req.entries[0].level = Some(Level::First);
        req.date = Some(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap());

        let planned = plan_edit(&store, &req, edit_id, today()).unwrap();
        assert_eq!(planned.level, Level::First);

        let two_entries = request(5, vec![entry(s, o), entry(s, o)]);
        let err = plan_edit(&store, &two_entries, edit_id, today()).unwrap_err();
        assert!(matches!(err, ClassifyError::Validation(_)));
    }

    #[test]
    fn edit_collides_with_another_records_number() {
        let existing = record(5, "A", "AAA-111", Level::First);
        let other = record(6, "B", "BBB-222", Level::First);
        let edit_id = existing.id;
        let store = ViolationStore::from_rows(vec![existing, other]);

        let mut req = request(6, vec![entry(Uuid::new_v4(), Uuid::new_v4())]);
        req.entries[0].level = Some(Level::First);

        let err = plan_edit(&store, &req, edit_id, today()).unwrap_err();
        assert!(matches!(err, ClassifyError::NumberCollision { no: 6, .. }));
    }
}
