//! Bridges `validator` derive output into `sf_core::ValidationErrors`

use sf_core::error::ValidationErrors;
use validator::Validate;

/// Run derive validations; field names are reported in camelCase, the way
/// clients sent them
pub fn validate<T: Validate>(payload: &T) -> Result<(), ValidationErrors> {
    let Err(errors) = payload.validate() else {
        return Ok(());
    };

    let mut out = ValidationErrors::new();
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);

    for (field, field_errors) in fields {
        for error in field_errors {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("is invalid ({})", error.code));
            out.add(camel_case(field), message);
        }
    }
    Err(out)
}

/// Password policy with a configurable minimum length
pub fn validate_password(
    field: &str,
    password: &str,
    min_length: usize,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if password.chars().count() < min_length {
        errors.add(field, format!("must be at least {} characters", min_length));
    }
    if password.chars().all(|c| c.is_alphabetic()) && !password.is_empty() {
        errors.add(field, "must contain at least one non-letter character");
    }
    errors.into_result()
}

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
