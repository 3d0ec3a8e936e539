//! Input validation shared by the check-in and booking flows
//!
//! Request types derive `validator::Validate` and point their fields at the
//! rules below; [`first_failure`] turns the collected errors back into the
//! one message the kiosk shows.

use std::borrow::Cow;

use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

/// Lowest valid student id (grade 1, class 1, number 01).
pub const MIN_STUDENT_ID: u32 = 10101;
/// Highest valid student id (grade 3, class 10, number 27).
pub const MAX_STUDENT_ID: u32 = 31027;

/// Error code for a blank required field
pub const REQUIRED: &str = "required";
/// Error code for a malformed student id
pub const STUDENT_ID: &str = "student_id";

/// Validate a student id: exactly five ASCII digits within
/// [`MIN_STUDENT_ID`]..=[`MAX_STUDENT_ID`].
///
/// Returns the user-facing reason on failure.
pub fn validate_student_id(student_id: &str) -> Result<u32, String> {
    let trimmed = student_id.trim();
    if trimmed.len() != 5 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err("Student id must be exactly 5 digits".to_string());
    }

    let num: u32 = trimmed
        .parse()
        .map_err(|_| "Student id must be exactly 5 digits".to_string())?;

    if !(MIN_STUDENT_ID..=MAX_STUDENT_ID).contains(&num) {
        return Err(format!(
            "Student id must be between {} and {}",
            MIN_STUDENT_ID, MAX_STUDENT_ID
        ));
    }

    Ok(num)
}

/// `#[validate(custom)]` rule: non-blank after trimming
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(REQUIRED));
    }
    Ok(())
}

/// `#[validate(custom)]` rule: required, then [`validate_student_id`]
pub fn student_id_rule(student_id: &str) -> Result<(), ValidationError> {
    not_blank(student_id)?;
    validate_student_id(student_id).map(|_| ()).map_err(|reason| {
        let mut err = ValidationError::new(STUDENT_ID);
        err.message = Some(Cow::Owned(reason));
        err
    })
}

/// The failure a request is rejected with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// Some required field was blank
    Missing,
    /// A field was present but malformed; carries the reason
    Invalid(String),
}

/// Collapse validator output into one failure. A blank field wins over a
/// malformed one so the student is asked to fill in the form first.
pub fn first_failure(errors: &ValidationErrors) -> ValidationFailure {
    let mut invalid: Option<String> = None;

    for kind in errors.errors().values() {
        let ValidationErrorsKind::Field(list) = kind else {
            continue;
        };
        for err in list {
            if err.code == REQUIRED {
                return ValidationFailure::Missing;
            }
            if invalid.is_none() {
                invalid = Some(
                    err.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string()),
                );
            }
        }
    }

    ValidationFailure::Invalid(invalid.unwrap_or_else(|| errors.to_string()))
}
