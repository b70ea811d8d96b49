//! Field-level validation
//!
//! Violation dates are optional but, when present, must not be in the
//! future and must fall within the trailing 1-year window. Receipt numbers
//! are 3-50 characters of letters, digits, hyphens, and underscores.

use chrono::{Months, NaiveDate};

use super::ClassifyError;

/// Validate an optional violation date against `today`.
pub fn validate_violation_date(
    date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(), ClassifyError> {
    let Some(date) = date else {
        return Ok(());
    };

    if date > today {
        return Err(ClassifyError::Validation(
            "Violation date cannot be in the future".to_string(),
        ));
    }

    let one_year_ago = today
        .checked_sub_months(Months::new(12))
        .unwrap_or(NaiveDate::MIN);
    if date < one_year_ago {
        return Err(ClassifyError::Validation(
            "Violation date cannot be older than 1 year".to_string(),
        ));
    }

    Ok(())
}

/// Validate the official receipt number format.
pub fn validate_receipt_number(receipt: &str) -> Result<(), ClassifyError> {
    if receipt.is_empty() {
        return Err(ClassifyError::Validation(
            "Receipt number is required".to_string(),
        ));
    }

    let valid_chars = receipt
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid_chars || receipt.len() < 3 || receipt.len() > 50 {
        return Err(ClassifyError::Validation(
            "Invalid receipt format. Use letters, numbers, hyphens, underscores (3-50 chars). Example: OR-2026-001"
                .to_string(),
        ));
    }

    Ok(())
}

/// Minimal email shape check for the login gate.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Validate login credentials before touching the user table.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), ClassifyError> {
    if email.is_empty() || password.is_empty() {
        return Err(ClassifyError::Validation(
            "Email and password are required".to_string(),
        ));
    }
    if !is_valid_email(email) {
        return Err(ClassifyError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }
    if password.len() < 6 {
        return Err(ClassifyError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 27).unwrap()
    }

    #[test]
    fn empty_date_is_accepted() {
        assert!(validate_violation_date(None, today()).is_ok());
    }

    #[test]
    fn tomorrow_is_rejected() {
        let tomorrow = today().succ_opt();
        assert!(validate_violation_date(tomorrow, today()).is_err());
    }

    #[test]
    fn today_is_accepted() {
        assert!(validate_violation_date(Some(today()), today()).is_ok());
    }

    #[test]
    fn exactly_one_year_ago_is_accepted() {
        let one_year = NaiveDate::from_ymd_opt(2025, 8, 27).unwrap();
        assert!(validate_violation_date(Some(one_year), today()).is_ok());
    }

    #[test]
    fn three_hundred_days_ago_is_accepted() {
        let date = today() - chrono::Days::new(300);
        assert!(validate_violation_date(Some(date), today()).is_ok());
    }

    #[test]
    fn three_hundred_sixty_six_days_ago_is_rejected() {
        let date = today() - chrono::Days::new(366);
        assert!(validate_violation_date(Some(date), today()).is_err());
    }

    #[test]
    fn receipt_format_bounds() {
        assert!(validate_receipt_number("OR-2026-001").is_ok());
        assert!(validate_receipt_number("abc").is_ok());
        assert!(validate_receipt_number("A_1").is_ok());

        assert!(validate_receipt_number("").is_err());
        assert!(validate_receipt_number("ab").is_err());
        assert!(validate_receipt_number(&"x".repeat(51)).is_err());
        assert!(validate_receipt_number("OR 001").is_err());
        assert!(validate_receipt_number("OR#001").is_err());
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b@sub.example.org"));

        assert!(!is_valid_email("user"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("us er@example.com"));
    }

    #[test]
    fn credential_checks() {
        assert!(validate_credentials("user@example.com", "secret1").is_ok());
        assert!(validate_credentials("", "secret1").is_err());
        assert!(validate_credentials("user@example.com", "short").is_err());
        assert!(validate_credentials("not-an-email", "secret1").is_err());
    }
}
