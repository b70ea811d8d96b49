//! Domain models
//!
//! A violation record is one traffic citation owned by exactly one user.
//! The progressive offense level and the payment state are the two fields
//! with real behavior behind them; everything else is captured as entered,
//! with section/offense display names denormalized at write time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Progressive offense level: 1st, 2nd, or 3rd offense.
///
/// Levels never exceed 3 — repeat offenses beyond the third are still
/// recorded at level 3. Serialized as the strings `"1"`, `"2"`, `"3"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "1")]
    First,
    #[serde(rename = "2")]
    Second,
    #[serde(rename = "3")]
    Third,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::First => "1",
            Level::Second => "2",
            Level::Third => "3",
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            Level::First => 1,
            Level::Second => 2,
            Level::Third => 3,
        }
    }

    pub fn from_i64(value: i64) -> Option<Level> {
        match value {
            1 => Some(Level::First),
            2 => Some(Level::Second),
            3 => Some(Level::Third),
            _ => None,
        }
    }

    /// Level reached after one more offense, capped at the third.
    pub fn after(prior_max: Option<Level>) -> Level {
        match prior_max {
            None => Level::First,
            Some(Level::First) => Level::Second,
            Some(Level::Second) | Some(Level::Third) => Level::Third,
        }
    }

    /// Human-facing text used in exports: `1st Offense`, `2nd Offense`, `3rd Offense`.
    pub fn display_text(&self) -> &'static str {
        match self {
            Level::First => "1st Offense",
            Level::Second => "2nd Offense",
            Level::Third => "3rd Offense",
        }
    }

    /// Parse the flexible level spellings accepted by spreadsheet import:
    /// `1`, `1st`, `1st offense` (any case), and likewise for 2 and 3.
    pub fn parse_flexible(value: &str) -> Option<Level> {
        match value.trim().to_lowercase().as_str() {
            "1" | "1st" | "1st offense" => Some(Level::First),
            "2" | "2nd" | "2nd offense" => Some(Level::Second),
            "3" | "3rd" | "3rd offense" => Some(Level::Third),
            _ => None,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment state of a violation record.
///
/// Receipt fields exist only in the `Paid` variant, so payment data cannot
/// be present on an unpaid record. `Pending` is tolerated for display but is
/// never written by this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum PaymentStatus {
    Unpaid,
    Pending,
    Paid {
        #[serde(rename = "officialReceiptNumber")]
        official_receipt_number: String,
        #[serde(rename = "datePaid")]
        date_paid: NaiveDate,
    },
}

impl PaymentStatus {
    /// Status label as shown in the dashboard and in exports.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid { .. } => "Paid",
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid { .. })
    }

    pub fn receipt_number(&self) -> Option<&str> {
        match self {
            PaymentStatus::Paid {
                official_receipt_number,
                ..
            } => Some(official_receipt_number),
            _ => None,
        }
    }

    pub fn date_paid(&self) -> Option<NaiveDate> {
        match self {
            PaymentStatus::Paid { date_paid, .. } => Some(*date_paid),
            _ => None,
        }
    }
}

/// One traffic citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    /// Store-assigned identity
    pub id: Uuid,
    /// User-assigned, human-facing sequence number, unique per user
    pub no: i64,
    pub name: String,
    pub plate_number: String,
    /// Calendar date of the offense; optional
    pub date: Option<NaiveDate>,
    /// Section display name captured at write time
    pub section: String,
    pub section_id: Uuid,
    /// Offense display name captured at write time
    pub offenses: String,
    pub offense_id: Uuid,
    pub level: Level,
    /// Fine amount from the fine schedule for (offense, level) at write time
    pub fine: f64,
    #[serde(flatten)]
    pub status: PaymentStatus,
    /// Owning user; the sole authorization boundary
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Top-level statutory category grouping offenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: Uuid,
    pub section_name: String,
}

/// A specific violation type within a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offense {
    pub id: Uuid,
    pub section_id: Uuid,
    pub offense_name: String,
}

/// Fine schedule entry: fixed amount for one (offense, level) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FineRate {
    pub id: Uuid,
    pub offense_id: Uuid,
    pub level: Level,
    pub amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_serializes_as_digit_string() {
        assert_eq!(serde_json::to_string(&Level::First).unwrap(), "\"1\"");
        assert_eq!(serde_json::to_string(&Level::Third).unwrap(), "\"3\"");
        let parsed: Level = serde_json::from_str("\"2\"").unwrap();
        assert_eq!(parsed, Level::Second);
    }

    #[test]
    fn level_parse_flexible_accepts_ordinal_spellings() {
        assert_eq!(Level::parse_flexible("1"), Some(Level::First));
        assert_eq!(Level::parse_flexible(" 1st "), Some(Level::First));
        assert_eq!(Level::parse_flexible("2ND OFFENSE"), Some(Level::Second));
        assert_eq!(Level::parse_flexible("3rd"), Some(Level::Third));
        assert_eq!(Level::parse_flexible("4"), None);
        assert_eq!(Level::parse_flexible(""), None);
    }

    #[test]
    fn level_after_caps_at_third() {
        assert_eq!(Level::after(None), Level::First);
        assert_eq!(Level::after(Some(Level::First)), Level::Second);
        assert_eq!(Level::after(Some(Level::Second)), Level::Third);
        assert_eq!(Level::after(Some(Level::Third)), Level::Third);
    }

    #[test]
    fn payment_status_flattens_into_record_json() {
        let record = ViolationRecord {
            id: Uuid::nil(),
            no: 5,
            name: "Juan Dela Cruz".to_string(),
            plate_number: "ABC-1234".to_string(),
            date: None,
            section: "Seatbelt and Helmet (Section 70)".to_string(),
            section_id: Uuid::nil(),
            offenses: "No Helmet".to_string(),
            offense_id: Uuid::nil(),
            level: Level::First,
            fine: 150.0,
            status: PaymentStatus::Paid {
                official_receipt_number: "OR-2026-001".to_string(),
                date_paid: NaiveDate::from_ymd_opt(2026, 2, 24).unwrap(),
            },
            user_id: Uuid::nil(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "Paid");
        assert_eq!(json["officialReceiptNumber"], "OR-2026-001");
        assert_eq!(json["plateNumber"], "ABC-1234");

        let back: ViolationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn unpaid_status_has_no_receipt() {
        let status = PaymentStatus::Unpaid;
        assert_eq!(status.label(), "Unpaid");
        assert!(status.receipt_number().is_none());
        assert!(status.date_paid().is_none());
        assert!(!status.is_paid());
    }
}
