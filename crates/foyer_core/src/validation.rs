//! Field-level validation helpers shared by every model.
//!
//! # Responsibility
//! - Provide small, composable checks used by `validate()` implementations.
//! - Report the offending field name so callers can surface it to users.
//!
//! # Invariants
//! - Helpers never mutate input and never panic.
//! - Non-finite floats (`NaN`, infinities) are always rejected.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::hash::Hash;

/// Reason attached to a [`ValidationError`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    /// Text is empty after trim.
    Blank,
    /// Text exceeds the maximum allowed characters.
    TooLong { max: usize },
    /// Number must be strictly greater than zero.
    NotPositive,
    /// Number must be zero or greater.
    Negative,
    /// Number is outside the inclusive range.
    OutOfRange { min: f64, max: f64 },
    /// NaN or infinite value.
    NotFinite,
    /// Range end is earlier than its start.
    EndBeforeStart,
    /// Required optional value is absent.
    Missing,
    /// Value appears more than once in a collection.
    Duplicate(String),
    /// Free-form rule violation.
    Invalid(String),
}

/// Validation failure for one model field.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: &'static str,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(field: &'static str, kind: ValidationErrorKind) -> Self {
        Self { field, kind }
    }

    /// Shorthand for [`ValidationErrorKind::Invalid`].
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::new(field, ValidationErrorKind::Invalid(message.into()))
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let field = self.field;
        match &self.kind {
            ValidationErrorKind::Blank => write!(f, "`{field}` must not be blank"),
            ValidationErrorKind::TooLong { max } => {
                write!(f, "`{field}` must be at most {max} characters")
            }
            ValidationErrorKind::NotPositive => write!(f, "`{field}` must be positive"),
            ValidationErrorKind::Negative => write!(f, "`{field}` must not be negative"),
            ValidationErrorKind::OutOfRange { min, max } => {
                write!(f, "`{field}` must be between {min} and {max}")
            }
            ValidationErrorKind::NotFinite => write!(f, "`{field}` must be a finite number"),
            ValidationErrorKind::EndBeforeStart => {
                write!(f, "`{field}` must not end before it starts")
            }
            ValidationErrorKind::Missing => write!(f, "`{field}` is required"),
            ValidationErrorKind::Duplicate(value) => {
                write!(f, "`{field}` contains duplicate value `{value}`")
            }
            ValidationErrorKind::Invalid(message) => write!(f, "`{field}` is invalid: {message}"),
        }
    }
}

impl Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn require_non_blank(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, ValidationErrorKind::Blank));
    }
    Ok(())
}

pub fn require_max_len(field: &'static str, value: &str, max: usize) -> ValidationResult {
    if value.chars().count() > max {
        return Err(ValidationError::new(
            field,
            ValidationErrorKind::TooLong { max },
        ));
    }
    Ok(())
}

pub fn require_finite(field: &'static str, value: f64) -> ValidationResult {
    if !value.is_finite() {
        return Err(ValidationError::new(field, ValidationErrorKind::NotFinite));
    }
    Ok(())
}

pub fn require_positive(field: &'static str, value: f64) -> ValidationResult {
    require_finite(field, value)?;
    if value <= 0.0 {
        return Err(ValidationError::new(field, ValidationErrorKind::NotPositive));
    }
    Ok(())
}

pub fn require_non_negative(field: &'static str, value: f64) -> ValidationResult {
    require_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::new(field, ValidationErrorKind::Negative));
    }
    Ok(())
}

/// Inclusive range check.
pub fn require_range(field: &'static str, value: f64, min: f64, max: f64) -> ValidationResult {
    require_finite(field, value)?;
    if value < min || value > max {
        return Err(ValidationError::new(
            field,
            ValidationErrorKind::OutOfRange { min, max },
        ));
    }
    Ok(())
}

/// Inclusive range check for integers.
pub fn require_int_range(field: &'static str, value: i64, min: i64, max: i64) -> ValidationResult {
    if value < min || value > max {
        return Err(ValidationError::new(
            field,
            ValidationErrorKind::OutOfRange {
                min: min as f64,
                max: max as f64,
            },
        ));
    }
    Ok(())
}

pub fn require_date_order(
    field: &'static str,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> ValidationResult {
    match end {
        Some(end) if end < start => Err(ValidationError::new(
            field,
            ValidationErrorKind::EndBeforeStart,
        )),
        _ => Ok(()),
    }
}

/// Same as [`require_date_order`] for epoch-millisecond instants.
pub fn require_instant_order(
    field: &'static str,
    start: i64,
    end: Option<i64>,
) -> ValidationResult {
    match end {
        Some(end) if end < start => Err(ValidationError::new(
            field,
            ValidationErrorKind::EndBeforeStart,
        )),
        _ => Ok(()),
    }
}

pub fn require_present<'a, T>(
    field: &'static str,
    value: Option<&'a T>,
) -> Result<&'a T, ValidationError> {
    value.ok_or_else(|| ValidationError::new(field, ValidationErrorKind::Missing))
}

pub fn require_distinct<T>(field: &'static str, values: &[T]) -> ValidationResult
where
    T: Eq + Hash + Display,
{
    let mut seen = HashSet::with_capacity(values.len());
    for value in values {
        if !seen.insert(value) {
            return Err(ValidationError::new(
                field,
                ValidationErrorKind::Duplicate(value.to_string()),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected_after_trim() {
        let err = require_non_blank("name", "   \t").unwrap_err();
        assert_eq!(err.field, "name");
        assert_eq!(err.kind, ValidationErrorKind::Blank);
        assert!(require_non_blank("name", " x ").is_ok());
    }

    #[test]
    fn max_len_counts_characters_not_bytes() {
        assert!(require_max_len("name", "éééé", 4).is_ok());
        assert!(require_max_len("name", "ééééé", 4).is_err());
    }

    #[test]
    fn positive_rejects_zero_and_nan() {
        assert!(require_positive("qty", 0.0).is_err());
        assert!(require_positive("qty", -1.0).is_err());
        let nan = require_positive("qty", f64::NAN).unwrap_err();
        assert_eq!(nan.kind, ValidationErrorKind::NotFinite);
        assert!(require_positive("qty", 0.01).is_ok());
    }

    #[test]
    fn range_is_inclusive() {
        assert!(require_range("height", 250.0, 0.0, 250.0).is_ok());
        assert!(require_range("height", 250.1, 0.0, 250.0).is_err());
        assert!(require_int_range("month", 12, 1, 12).is_ok());
        assert!(require_int_range("month", 13, 1, 12).is_err());
    }

    #[test]
    fn date_order_accepts_equal_and_missing_end() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert!(require_date_order("period", day, None).is_ok());
        assert!(require_date_order("period", day, Some(day)).is_ok());
        let err = require_date_order("period", day, day.pred_opt()).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::EndBeforeStart);
    }

    #[test]
    fn distinct_reports_first_duplicate() {
        let err = require_distinct("numbers", &[3, 7, 3]).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::Duplicate("3".to_string()));
        assert!(require_distinct("numbers", &[1, 2, 3]).is_ok());
    }

    #[test]
    fn present_returns_inner_reference() {
        let value = Some(5);
        assert_eq!(*require_present("x", value.as_ref()).unwrap(), 5);
        assert!(require_present::<i32>("x", None).is_err());
    }
}
