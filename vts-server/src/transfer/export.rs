//! Spreadsheet row export

use vts_common::models::ViolationRecord;

use crate::error::ApiError;

use super::HEADERS;

/// Render records as CSV text with the fixed header set. Levels are shown
/// as ordinal text; empty optional fields become empty cells.
pub fn write_csv(records: &[ViolationRecord]) -> Result<String, ApiError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(HEADERS)
        .map_err(|e| ApiError::Internal(format!("CSV write failed: {}", e)))?;

    for record in records {
        writer
            .write_record(&[
                record.no.to_string(),
                record.name.trim().to_string(),
                record.plate_number.trim().to_string(),
                record
                    .date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                record.section.trim().to_string(),
                record.offenses.trim().to_string(),
                record.level.display_text().to_string(),
                record.fine.to_string(),
                record.status.label().to_string(),
                record.status.receipt_number().unwrap_or_default().to_string(),
                record
                    .status
                    .date_paid()
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            ])
            .map_err(|e| ApiError::Internal(format!("CSV write failed: {}", e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV write failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| ApiError::Internal(format!("CSV encoding failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::testutil::record;
    use chrono::NaiveDate;
    use vts_common::models::{Level, PaymentStatus};

    #[test]
    fn header_row_matches_the_import_format() {
        let csv = write_csv(&[]).unwrap();
        assert_eq!(
            csv.trim_end(),
            "No.,Name,Plate Number,Date,Section,Offenses,Level,Fine,Status,Official Receipt Number,Date Paid"
        );
    }

    #[test]
    fn paid_record_exports_receipt_and_ordinal_level() {
        let mut paid = record(7, "Juan Dela Cruz", "ABC-1234", Level::Second);
        paid.date = NaiveDate::from_ymd_opt(2026, 2, 24);
        paid.status = PaymentStatus::Paid {
            official_receipt_number: "OR-2026-001".to_string(),
            date_paid: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        };

        let csv = write_csv(&[paid]).unwrap();
        let data_line = csv.lines().nth(1).unwrap();
        assert_eq!(
            data_line,
            "7,Juan Dela Cruz,ABC-1234,2026-02-24,Seatbelt and Helmet (Section 70),No Helmet,2nd Offense,150,Paid,OR-2026-001,2026-03-01"
        );
    }

    #[test]
    fn unpaid_record_exports_empty_payment_cells() {
        let unpaid = record(1, "Maria", "XYZ-789", Level::First);
        let csv = write_csv(&[unpaid]).unwrap();
        let data_line = csv.lines().nth(1).unwrap();
        assert!(data_line.ends_with("1st Offense,150,Unpaid,,"));
    }
}
