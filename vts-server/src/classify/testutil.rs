//! Shared builders for classifier tests

use chrono::Utc;
use uuid::Uuid;
use vts_common::models::{Level, PaymentStatus, ViolationRecord};

/// A fresh unpaid record with random identity and catalog ids.
pub fn record(no: i64, name: &str, plate: &str, level: Level) -> ViolationRecord {
    ViolationRecord {
        id: Uuid::new_v4(),
        no,
        name: name.to_string(),
        plate_number: plate.to_string(),
        date: None,
        section: "Seatbelt and Helmet (Section 70)".to_string(),
        section_id: Uuid::new_v4(),
        offenses: "No Helmet".to_string(),
        offense_id: Uuid::new_v4(),
        level,
        fine: 150.0,
        status: PaymentStatus::Unpaid,
        user_id: Uuid::new_v4(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Same as [`record`] but with caller-fixed section/offense ids so entries
/// can share an offense history.
pub fn record_for(
    no: i64,
    name: &str,
    plate: &str,
    section_id: Uuid,
    offense_id: Uuid,
    level: Level,
) -> ViolationRecord {
    let mut r = record(no, name, plate, level);
    r.section_id = section_id;
    r.offense_id = offense_id;
    r
}
