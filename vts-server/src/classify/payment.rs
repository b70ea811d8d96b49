//! Payment transitions
//!
//! `mark_paid` and `undo_payment` are the only mutators of payment data.
//! Receipt fields live inside the `Paid` variant, so a record cannot carry
//! them in any other state.

use chrono::{NaiveDate, Utc};
use vts_common::models::{PaymentStatus, ViolationRecord};

use super::store::ViolationStore;
use super::validate::validate_receipt_number;
use super::ClassifyError;

/// Transition `Unpaid|Pending -> Paid`.
///
/// Validates the receipt format and its per-user uniqueness against the
/// store (excluding the record's own id, so re-marking with the same receipt
/// is allowed). Returns the updated record; the caller persists it.
pub fn mark_paid(
    store: &ViolationStore,
    record: &ViolationRecord,
    receipt: &str,
    payment_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<ViolationRecord, ClassifyError> {
    let receipt = receipt.trim();
    validate_receipt_number(receipt)?;

    if let Some(existing) = store.receipt_in_use(receipt, Some(record.id)) {
        return Err(ClassifyError::ReceiptAlreadyUsed {
            receipt: receipt.to_string(),
            existing_no: existing.no,
        });
    }

    let mut updated = record.clone();
    updated.status = PaymentStatus::Paid {
        official_receipt_number: receipt.to_string(),
        date_paid: payment_date.unwrap_or(today),
    };
    updated.updated_at = Utc::now();
    Ok(updated)
}

/// Transition back to `Unpaid`, clearing receipt fields unconditionally.
pub fn undo_payment(record: &ViolationRecord) -> ViolationRecord {
    let mut updated = record.clone();
    updated.status = PaymentStatus::Unpaid;
    updated.updated_at = Utc::now();
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::testutil::record;
    use vts_common::models::Level;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 27).unwrap()
    }

    #[test]
    fn mark_paid_sets_receipt_and_date() {
        let unpaid = record(1, "Juan", "ABC-123", Level::First);
        let store = ViolationStore::from_rows(vec![unpaid.clone()]);

        let paid = mark_paid(&store, &unpaid, "OR-001", None, today()).unwrap();
        assert!(paid.status.is_paid());
        assert_eq!(paid.status.receipt_number(), Some("OR-001"));
        assert_eq!(paid.status.date_paid(), Some(today()));
    }

    #[test]
    fn explicit_payment_date_wins_over_today() {
        let unpaid = record(1, "Juan", "ABC-123", Level::First);
        let store = ViolationStore::from_rows(vec![unpaid.clone()]);
        let date = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();

        let paid = mark_paid(&store, &unpaid, "OR-001", Some(date), today()).unwrap();
        assert_eq!(paid.status.date_paid(), Some(date));
    }

    #[test]
    fn reused_receipt_is_rejected_until_payment_is_undone() {
        let a = record(1, "Juan", "ABC-123", Level::First);
        let b = record(2, "Maria", "XYZ-789", Level::First);
        let mut store = ViolationStore::from_rows(vec![a.clone(), b.clone()]);

        let a_paid = mark_paid(&store, &a, "OR-001", None, today()).unwrap();
        store.apply_update(a_paid.clone());

        let err = mark_paid(&store, &b, "OR-001", None, today()).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::ReceiptAlreadyUsed { existing_no: 1, .. }
        ));

        store.apply_update(undo_payment(&a_paid));
        assert!(mark_paid(&store, &b, "OR-001", None, today()).is_ok());
    }

    #[test]
    fn re_marking_own_record_with_same_receipt_is_allowed() {
        let a = record(1, "Juan", "ABC-123", Level::First);
        let mut store = ViolationStore::from_rows(vec![a.clone()]);
        let a_paid = mark_paid(&store, &a, "OR-001", None, today()).unwrap();
        store.apply_update(a_paid.clone());

        assert!(mark_paid(&store, &a_paid, "OR-001", None, today()).is_ok());
    }

    #[test]
    fn receipt_is_trimmed_before_validation() {
        let a = record(1, "Juan", "ABC-123", Level::First);
        let store = ViolationStore::from_rows(vec![a.clone()]);

        let paid = mark_paid(&store, &a, "  OR-001  ", None, today()).unwrap();
        assert_eq!(paid.status.receipt_number(), Some("OR-001"));
    }

    #[test]
    fn bad_receipt_format_is_rejected() {
        let a = record(1, "Juan", "ABC-123", Level::First);
        let store = ViolationStore::from_rows(vec![a.clone()]);

        assert!(mark_paid(&store, &a, "", None, today()).is_err());
        assert!(mark_paid(&store, &a, "O!", None, today()).is_err());
    }

    #[test]
    fn undo_payment_clears_receipt_fields() {
        let a = record(1, "Juan", "ABC-123", Level::First);
        let store = ViolationStore::from_rows(vec![a.clone()]);
        let paid = mark_paid(&store, &a, "OR-001", None, today()).unwrap();

        let unpaid = undo_payment(&paid);
        assert_eq!(unpaid.status, PaymentStatus::Unpaid);
        assert!(unpaid.status.receipt_number().is_none());
    }
}
