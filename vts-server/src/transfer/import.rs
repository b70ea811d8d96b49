//! Spreadsheet row import
//!
//! Each row is resolved independently against the reference catalog, so a
//! bad row never stops the rest of the file; callers collect per-row errors
//! into a summary report. Section and offense names are matched fuzzily:
//! normalized exact match first, then substring containment in either
//! direction, with multiple candidates rejected as ambiguous rather than
//! silently picking the first.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;
use vts_common::models::{Level, Offense, PaymentStatus, Section, ViolationRecord};

use crate::classify::store::ViolationStore;
use crate::classify::validate::validate_receipt_number;
use crate::classify::ClassifyError;

/// Collapse a display name to its matching key: lowercase, runs of
/// non-alphanumeric characters become single spaces.
pub fn normalize_text(value: &str) -> String {
    let mut key = String::with_capacity(value.len());
    let mut pending_space = false;
    for c in value.chars() {
        if c.is_alphanumeric() {
            if pending_space && !key.is_empty() {
                key.push(' ');
            }
            pending_space = false;
            key.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    key
}

/// Parse the status cell: `paid` means paid, anything else means unpaid.
pub fn parse_paid(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("paid")
}

/// One spreadsheet row as deserialized by the codec. All cells are kept as
/// strings so a blank or malformed cell surfaces as a row error, not a file
/// error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportRow {
    #[serde(rename = "No.", alias = "No", alias = "no", default)]
    pub no: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Plate Number", alias = "plate number", default)]
    pub plate_number: String,
    #[serde(rename = "Date", default)]
    pub date: String,
    #[serde(rename = "Section", default)]
    pub section: String,
    #[serde(rename = "Offenses", alias = "Offense", default)]
    pub offenses: String,
    #[serde(rename = "Level", default)]
    pub level: String,
    #[serde(rename = "Fine", default)]
    pub fine: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Official Receipt Number", default)]
    pub official_receipt_number: String,
    #[serde(rename = "Date Paid", default)]
    pub date_paid: String,
}

/// A row resolved against the catalog, ready for fine lookup and insert.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRow {
    pub no: i64,
    pub name: String,
    pub plate_number: String,
    pub date: Option<NaiveDate>,
    pub section_id: Uuid,
    pub section_name: String,
    pub offense_id: Uuid,
    pub offense_name: String,
    pub level: Level,
    /// Fine taken from the cell when positive; otherwise the caller uses
    /// the schedule amount.
    pub fine_override: Option<f64>,
    /// Receipt number and payment date when the row is marked paid.
    pub payment: Option<(String, Option<NaiveDate>)>,
}

/// Catalog lookup index for fuzzy name matching.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    sections: Vec<SectionEntry>,
}

#[derive(Debug, Clone)]
pub struct SectionEntry {
    pub id: Uuid,
    pub name: String,
    key: String,
    offenses: Vec<OffenseEntry>,
}

#[derive(Debug, Clone)]
pub struct OffenseEntry {
    pub id: Uuid,
    pub name: String,
    key: String,
}

impl CatalogIndex {
    pub fn build(sections: &[Section], offenses: &[Offense]) -> Self {
        let sections = sections
            .iter()
            .map(|section| SectionEntry {
                id: section.id,
                name: section.section_name.clone(),
                key: normalize_text(&section.section_name),
                offenses: offenses
                    .iter()
                    .filter(|offense| offense.section_id == section.id)
                    .map(|offense| OffenseEntry {
                        id: offense.id,
                        name: offense.offense_name.clone(),
                        key: normalize_text(&offense.offense_name),
                    })
                    .collect(),
            })
            .collect();
        Self { sections }
    }

    pub fn match_section(&self, raw: &str) -> Result<Option<&SectionEntry>, ClassifyError> {
        find_flexible(self.sections.iter().map(|s| (s.key.as_str(), s)), raw, "Section")
    }
}

impl SectionEntry {
    pub fn match_offense(&self, raw: &str) -> Result<Option<&OffenseEntry>, ClassifyError> {
        find_flexible(self.offenses.iter().map(|o| (o.key.as_str(), o)), raw, "Offense")
    }
}

/// Fuzzy lookup shared by section and offense matching. Exact key match
/// wins; otherwise substring containment in either direction must single
/// out one candidate.
fn find_flexible<'a, T>(
    items: impl Iterator<Item = (&'a str, &'a T)> + Clone,
    raw: &str,
    label: &str,
) -> Result<Option<&'a T>, ClassifyError> {
    let input = normalize_text(raw);
    if input.is_empty() {
        return Ok(None);
    }

    if let Some((_, value)) = items.clone().find(|(key, _)| *key == input) {
        return Ok(Some(value));
    }

    let candidates: Vec<&T> = items
        .filter(|(key, _)| key.contains(&input) || input.contains(key))
        .map(|(_, value)| value)
        .collect();

    match candidates.len() {
        0 => Ok(None),
        1 => Ok(Some(candidates[0])),
        _ => Err(ClassifyError::AmbiguousMatch {
            label: label.to_string(),
            input: raw.to_string(),
        }),
    }
}

/// Resolve one row against the catalog and the set of already-used sequence
/// numbers. Pure; the fine schedule lookup and insert happen afterwards.
pub fn resolve_row(
    row: &ImportRow,
    index: &CatalogIndex,
    used_nos: &HashSet<i64>,
) -> Result<ResolvedRow, ClassifyError> {
    let no = row.no.trim().parse::<i64>().unwrap_or(0);
    let section_raw = row.section.trim();
    let offense_raw = row.offenses.trim();
    let level = Level::parse_flexible(&row.level);

    if no <= 0 || section_raw.is_empty() || offense_raw.is_empty() || level.is_none() {
        return Err(ClassifyError::Validation(
            "Missing required fields: No., Section, Offense, Level".to_string(),
        ));
    }
    let level = level.unwrap_or(Level::First);

    if used_nos.contains(&no) {
        return Err(ClassifyError::Validation(format!("No. {} already exists", no)));
    }

    let section = index.match_section(section_raw)?.ok_or_else(|| {
        ClassifyError::Validation(format!("Section not found: {}", section_raw))
    })?;
    let offense = section.match_offense(offense_raw)?.ok_or_else(|| {
        ClassifyError::Validation(format!(
            "Offense not found in section \"{}\": {}",
            section.name, offense_raw
        ))
    })?;

    let date = parse_date_cell(&row.date, "Date")?;

    let paid = parse_paid(&row.status);
    let receipt = row.official_receipt_number.trim();
    if paid && receipt.is_empty() {
        return Err(ClassifyError::Validation(
            "Official Receipt Number is required when Status is Paid".to_string(),
        ));
    }
    let payment = if paid {
        Some((receipt.to_string(), parse_date_cell(&row.date_paid, "Date Paid")?))
    } else {
        None
    };

    let fine_override = row
        .fine
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| *amount > 0.0);

    Ok(ResolvedRow {
        no,
        name: row.name.trim().to_string(),
        plate_number: row.plate_number.trim().to_uppercase(),
        date,
        section_id: section.id,
        section_name: section.name.clone(),
        offense_id: offense.id,
        offense_name: offense.name.clone(),
        level,
        fine_override,
        payment,
    })
}

/// Assemble the record for a resolved row. The fine comes from the cell
/// override or from `scheduled_fine`; a row with neither fails rather than
/// landing with a zero fine. Payment state is validated against the store,
/// which already holds rows imported earlier in the same file.
pub fn build_record(
    resolved: &ResolvedRow,
    scheduled_fine: Option<f64>,
    store: &ViolationStore,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<ViolationRecord, ClassifyError> {
    let fine = match resolved.fine_override {
        Some(amount) => amount,
        None => scheduled_fine.ok_or_else(|| ClassifyError::FineScheduleMissing {
            offense: resolved.offense_name.clone(),
            level: resolved.level,
        })?,
    };

    let status = match &resolved.payment {
        Some((receipt, date_paid)) => {
            let receipt = receipt.trim();
            validate_receipt_number(receipt)?;
            if let Some(existing) = store.receipt_in_use(receipt, None) {
                return Err(ClassifyError::ReceiptAlreadyUsed {
                    receipt: receipt.to_string(),
                    existing_no: existing.no,
                });
            }
            PaymentStatus::Paid {
                official_receipt_number: receipt.to_string(),
                date_paid: date_paid.unwrap_or(today),
            }
        }
        None => PaymentStatus::Unpaid,
    };

    let now = Utc::now();
    Ok(ViolationRecord {
        id: Uuid::new_v4(),
        no: resolved.no,
        name: resolved.name.clone(),
        plate_number: resolved.plate_number.clone(),
        date: resolved.date,
        section: resolved.section_name.clone(),
        section_id: resolved.section_id,
        offenses: resolved.offense_name.clone(),
        offense_id: resolved.offense_id,
        level: resolved.level,
        fine,
        status,
        user_id,
        created_at: now,
        updated_at: now,
    })
}

fn parse_date_cell(value: &str, label: &str) -> Result<Option<NaiveDate>, ClassifyError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ClassifyError::Validation(format!("Invalid {}: {}", label, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> (CatalogIndex, Uuid, Uuid) {
        let section = Section {
            id: Uuid::new_v4(),
            section_name: "Seatbelt and Helmet (Section 70)".to_string(),
        };
        let speed = Section {
            id: Uuid::new_v4(),
            section_name: "Speed Limit (Section 69)".to_string(),
        };
        let offense = Offense {
            id: Uuid::new_v4(),
            section_id: section.id,
            offense_name: "No Helmet".to_string(),
        };
        let other = Offense {
            id: Uuid::new_v4(),
            section_id: section.id,
            offense_name: "No Seatbelt".to_string(),
        };
        let (section_id, offense_id) = (section.id, offense.id);
        let index = CatalogIndex::build(&[section, speed], &[offense, other]);
        (index, section_id, offense_id)
    }

    fn row() -> ImportRow {
        ImportRow {
            no: "1".to_string(),
            name: "Juan Dela Cruz".to_string(),
            plate_number: "abc-1234".to_string(),
            date: "2026-02-24".to_string(),
            section: "Helmet".to_string(),
            offenses: "No Helmet".to_string(),
            level: "1st Offense".to_string(),
            fine: "".to_string(),
            status: "Unpaid".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn normalize_text_collapses_punctuation_and_case() {
        assert_eq!(
            normalize_text("Seatbelt and Helmet (Section 70)"),
            "seatbelt and helmet section 70"
        );
        assert_eq!(normalize_text("  No-Helmet!! "), "no helmet");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn parse_paid_defaults_to_unpaid() {
        assert!(parse_paid("Paid"));
        assert!(parse_paid(" PAID "));
        assert!(!parse_paid("Unpaid"));
        assert!(!parse_paid(""));
        assert!(!parse_paid("settled"));
    }

    #[test]
    fn resolve_row_matches_fuzzily_and_normalizes_plate() {
        let (index, section_id, offense_id) = catalog();
        let resolved = resolve_row(&row(), &index, &HashSet::new()).unwrap();

        assert_eq!(resolved.section_id, section_id);
        assert_eq!(resolved.offense_id, offense_id);
        assert_eq!(resolved.plate_number, "ABC-1234");
        assert_eq!(resolved.level, Level::First);
        assert_eq!(resolved.date, NaiveDate::from_ymd_opt(2026, 2, 24));
        assert!(resolved.fine_override.is_none());
        assert!(resolved.payment.is_none());
    }

    #[test]
    fn ambiguous_section_input_is_rejected() {
        let (index, ..) = catalog();
        // "section" is contained in both section keys.
        let err = index.match_section("section").unwrap_err();
        assert!(matches!(err, ClassifyError::AmbiguousMatch { .. }));
    }

    #[test]
    fn ambiguous_offense_input_is_rejected() {
        let (index, ..) = catalog();
        let section = index.match_section("Helmet").unwrap().unwrap();
        // "no" is contained in both offense keys.
        let err = section.match_offense("no").unwrap_err();
        assert!(matches!(err, ClassifyError::AmbiguousMatch { .. }));
    }

    #[test]
    fn unknown_section_is_not_found() {
        let (index, ..) = catalog();
        assert!(index.match_section("Parking").unwrap().is_none());
    }

    #[test]
    fn missing_required_fields_fail_the_row() {
        let (index, ..) = catalog();

        let mut no_level = row();
        no_level.level = "maximum".to_string();
        assert!(resolve_row(&no_level, &index, &HashSet::new()).is_err());

        let mut no_number = row();
        no_number.no = "".to_string();
        assert!(resolve_row(&no_number, &index, &HashSet::new()).is_err());
    }

    #[test]
    fn duplicate_sequence_number_fails_the_row() {
        let (index, ..) = catalog();
        let used: HashSet<i64> = [1].into_iter().collect();
        let err = resolve_row(&row(), &index, &used).unwrap_err();
        assert!(matches!(err, ClassifyError::Validation(_)));
    }

    #[test]
    fn paid_row_requires_receipt() {
        let (index, ..) = catalog();
        let mut paid = row();
        paid.status = "Paid".to_string();
        assert!(resolve_row(&paid, &index, &HashSet::new()).is_err());

        paid.official_receipt_number = "OR-2026-001".to_string();
        let resolved = resolve_row(&paid, &index, &HashSet::new()).unwrap();
        assert_eq!(
            resolved.payment,
            Some(("OR-2026-001".to_string(), None))
        );
    }

    #[test]
    fn positive_fine_cell_overrides_schedule() {
        let (index, ..) = catalog();
        let mut custom = row();
        custom.fine = "750".to_string();
        let resolved = resolve_row(&custom, &index, &HashSet::new()).unwrap();
        assert_eq!(resolved.fine_override, Some(750.0));

        let mut zero = row();
        zero.fine = "0".to_string();
        assert!(resolve_row(&zero, &index, &HashSet::new())
            .unwrap()
            .fine_override
            .is_none());
    }

    #[test]
    fn bad_date_cell_fails_the_row() {
        let (index, ..) = catalog();
        let mut bad = row();
        bad.date = "24/02/2026".to_string();
        assert!(resolve_row(&bad, &index, &HashSet::new()).is_err());
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 27).unwrap()
    }

    #[test]
    fn row_without_any_fine_source_fails_instead_of_landing_at_zero() {
        let (index, ..) = catalog();
        let resolved = resolve_row(&row(), &index, &HashSet::new()).unwrap();

        let err = build_record(&resolved, None, &ViolationStore::new(), Uuid::new_v4(), today())
            .unwrap_err();
        assert!(matches!(err, ClassifyError::FineScheduleMissing { .. }));
    }

    #[test]
    fn scheduled_fine_lands_on_the_record() {
        let (index, ..) = catalog();
        let resolved = resolve_row(&row(), &index, &HashSet::new()).unwrap();

        let record =
            build_record(&resolved, Some(150.0), &ViolationStore::new(), Uuid::new_v4(), today())
                .unwrap();
        assert_eq!(record.fine, 150.0);
        assert_eq!(record.status, PaymentStatus::Unpaid);
    }

    #[test]
    fn fine_override_wins_over_the_schedule() {
        let (index, ..) = catalog();
        let mut custom = row();
        custom.fine = "750".to_string();
        let resolved = resolve_row(&custom, &index, &HashSet::new()).unwrap();

        let record =
            build_record(&resolved, None, &ViolationStore::new(), Uuid::new_v4(), today()).unwrap();
        assert_eq!(record.fine, 750.0);
    }

    #[test]
    fn reused_receipt_fails_the_row() {
        let (index, ..) = catalog();
        let mut existing = crate::classify::testutil::record(7, "X", "ZZZ-111", Level::First);
        existing.status = PaymentStatus::Paid {
            official_receipt_number: "OR-2026-001".to_string(),
            date_paid: today(),
        };
        let store = ViolationStore::from_rows(vec![existing]);

        let mut paid = row();
        paid.status = "Paid".to_string();
        paid.official_receipt_number = "OR-2026-001".to_string();
        let resolved = resolve_row(&paid, &index, &HashSet::new()).unwrap();

        let err = build_record(&resolved, Some(150.0), &store, Uuid::new_v4(), today()).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::ReceiptAlreadyUsed { existing_no: 7, .. }
        ));
    }
}
