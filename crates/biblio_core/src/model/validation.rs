//! Field-level validation shared by all catalog entities.
//!
//! Every check is pure and returns the first violated rule. Rules run in a
//! fixed order per entity: blank, too short, too long, then semantic rules.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Entry dates are `dd/MM/yyyy` with purely numeric components.
static ENTRY_DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)/(\d+)/(\d+)$").expect("entry date pattern is valid"));

const MIN_YEAR: u32 = 1900;
const MAX_YEAR: u32 = 2100;

/// Validation failure for one entity field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty or whitespace only.
    Blank { field: &'static str },
    /// Text field is shorter than the allowed minimum.
    TooShort { field: &'static str, min: usize },
    /// Text field is longer than the allowed maximum.
    TooLong { field: &'static str, max: usize },
    /// Category names itself as its parent.
    SelfParent(Uuid),
    /// Entry date is not a valid `dd/MM/yyyy` value.
    InvalidEntryDate(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank { field } => write!(f, "{field} must not be blank"),
            Self::TooShort { field, min } => {
                write!(f, "{field} must be at least {min} characters")
            }
            Self::TooLong { field, max } => {
                write!(f, "{field} must be at most {max} characters")
            }
            Self::SelfParent(id) => write!(f, "category {id} cannot be its own parent"),
            Self::InvalidEntryDate(value) => write!(
                f,
                "invalid entry date `{value}`; expected dd/MM/yyyy with year {MIN_YEAR}-{MAX_YEAR}"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Checks a required text field against blank/min/max rules, in that order.
pub(crate) fn check_required_text(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank { field });
    }
    let length = value.chars().count();
    if length < min {
        return Err(ValidationError::TooShort { field, min });
    }
    if length > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Checks an optional free-text field against a maximum length.
pub(crate) fn check_max_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Returns whether `value` is a `dd/MM/yyyy` date within supported bounds.
///
/// Day is only checked against 1..=31; month-specific lengths are not
/// enforced.
pub fn is_valid_entry_date(value: &str) -> bool {
    let Some(captures) = ENTRY_DATE_PATTERN.captures(value) else {
        return false;
    };
    let parts = [&captures[1], &captures[2], &captures[3]]
        .map(|part| part.parse::<u32>().ok());
    match parts {
        [Some(day), Some(month), Some(year)] => {
            (1..=31).contains(&day)
                && (1..=12).contains(&month)
                && (MIN_YEAR..=MAX_YEAR).contains(&year)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{check_max_text, check_required_text, is_valid_entry_date, ValidationError};

    #[test]
    fn entry_date_accepts_day_month_year() {
        assert!(is_valid_entry_date("31/01/2026"));
        assert!(is_valid_entry_date("1/1/1900"));
        assert!(is_valid_entry_date("01/12/2100"));
    }

    #[test]
    fn entry_date_rejects_out_of_range_and_bad_shapes() {
        for value in [
            "32/01/2026",
            "01/13/2026",
            "2026/01/31",
            "",
            "00/01/2026",
            "01/01/1899",
            "01/01/2101",
            "01-01-2026",
            "01/01/2026/",
            "aa/01/2026",
            " 01/01/2026",
            "99999999999/01/2026",
        ] {
            assert!(!is_valid_entry_date(value), "`{value}` should be invalid");
        }
    }

    #[test]
    fn required_text_checks_blank_before_length() {
        assert_eq!(
            check_required_text("name", "   ", 3, 100),
            Err(ValidationError::Blank { field: "name" })
        );
        assert_eq!(
            check_required_text("name", "ab", 3, 100),
            Err(ValidationError::TooShort {
                field: "name",
                min: 3
            })
        );
        assert_eq!(
            check_required_text("name", &"x".repeat(101), 3, 100),
            Err(ValidationError::TooLong {
                field: "name",
                max: 100
            })
        );
        assert!(check_required_text("name", "abc", 3, 100).is_ok());
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        assert!(check_required_text("name", "ééé", 3, 3).is_ok());
        assert!(check_max_text("biography", &"ü".repeat(500), 500).is_ok());
        assert!(check_max_text("biography", &"ü".repeat(501), 500).is_err());
    }
}
