//! Client-side checks mirroring the back office's request validation, so a
//! console user sees field errors before a round trip.
//!
//! The rules live as `#[validate(...)]` attributes on the request bodies.
//! This module holds the custom checks they name and flattens the
//! validator's error tree into `field: message` lines.

use std::borrow::Cow;

use validator::{Validate, ValidationError, ValidationErrorsKind};

use crate::{
    error::ValidationErrors,
    protocol::{CustomerDraft, InternetPlanDraft},
};

/// Optional leading `+`, then 6 to 20 digits, dashes or whitespace.
pub fn is_valid_phone(phone: &str) -> bool {
    let rest = phone.strip_prefix('+').unwrap_or(phone);
    let len = rest.chars().count();
    (6..=20).contains(&len)
        && rest
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || c == '-')
}

/// 3 to 10 ASCII alphanumerics, dashes or spaces.
pub fn is_valid_postal_code(code: &str) -> bool {
    let len = code.chars().count();
    (3..=10).contains(&len)
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ' ')
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

pub(crate) fn phone_shape(value: &str) -> Result<(), ValidationError> {
    if !is_valid_phone(value) {
        return Err(ValidationError::new("phone"));
    }
    Ok(())
}

pub(crate) fn postal_code_shape(value: &str) -> Result<(), ValidationError> {
    if !is_valid_postal_code(value) {
        return Err(ValidationError::new("postal_code"));
    }
    Ok(())
}

/// `postal_code` -> `postalCode`, matching the wire names.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn flatten(prefix: &str, errors: &validator::ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            camel_case(field)
        } else {
            format!("{prefix}.{}", camel_case(field))
        };
        match kind {
            ValidationErrorsKind::Field(failures) => {
                for failure in failures {
                    let message = failure
                        .message
                        .clone()
                        .unwrap_or_else(|| Cow::Owned(failure.code.to_string()));
                    out.push(format!("{path}: {message}"));
                }
            }
            ValidationErrorsKind::Struct(nested) => flatten(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten(&format!("{path}[{index}]"), nested, out);
                }
            }
        }
    }
}

impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut lines = Vec::new();
        flatten("", &errors, &mut lines);
        // The validator keys fields by hash map; sort for a stable report.
        lines.sort();
        ValidationErrors(lines)
    }
}

pub fn validate_customer_draft(draft: &CustomerDraft) -> Result<(), ValidationErrors> {
    draft.validate().map_err(ValidationErrors::from)
}

pub fn validate_internet_plan_draft(draft: &InternetPlanDraft) -> Result<(), ValidationErrors> {
    draft.validate().map_err(ValidationErrors::from)
}
