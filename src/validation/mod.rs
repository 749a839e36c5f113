//! Schema validation for forms and their nested fields.
//!
//! Validation collects every violation instead of stopping at the first, so
//! callers can render a complete error report. No side effects.

use url::Url;

use crate::errors::Violation;
use crate::models::{CreateFormRequest, Form, FormField};

/// Validate a form candidate for creation.
///
/// Create is the only path that insists on at least one field.
pub fn validate_new_form(request: &CreateFormRequest) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();

    check_name(&request.name, &mut violations);
    check_pdf_url(&request.pdf_url, &mut violations);

    if request.fields.is_empty() {
        violations.push(Violation::new(
            "fields",
            "Form must contain at least one field",
        ));
    }
    check_fields(&request.fields, &mut violations);

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Validate a stored (or merged) form before returning or committing it.
///
/// Field removal may legitimately empty a form, so an empty `fields` array
/// is tolerated here.
pub fn validate_stored_form(form: &Form) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();

    check_name(&form.name, &mut violations);
    check_pdf_url(&form.pdf_url, &mut violations);
    check_fields(&form.fields, &mut violations);

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check_name(name: &str, violations: &mut Vec<Violation>) {
    if name.trim().is_empty() {
        violations.push(Violation::new("name", "Name is required"));
    }
}

fn check_pdf_url(pdf_url: &str, violations: &mut Vec<Violation>) {
    if Url::parse(pdf_url).is_err() {
        violations.push(Violation::new("pdfUrl", "pdfUrl must be a well-formed URL"));
    }
}

fn check_fields(fields: &[FormField], violations: &mut Vec<Violation>) {
    for (index, field) in fields.iter().enumerate() {
        check_field(field, &format!("fields[{}]", index), violations);
    }
}

/// Validate one field. The field type itself is a closed enum, rejected at
/// deserialization; the checks here cover the nested value objects.
fn check_field(field: &FormField, path: &str, violations: &mut Vec<Violation>) {
    if field.name.trim().is_empty() {
        violations.push(Violation::new(
            format!("{}.name", path),
            "Field name is required",
        ));
    }
    if field.label.trim().is_empty() {
        violations.push(Violation::new(
            format!("{}.label", path),
            "Field label is required",
        ));
    }

    if let Some(options) = &field.options {
        for (index, option) in options.iter().enumerate() {
            if option.value.trim().is_empty() {
                violations.push(Violation::new(
                    format!("{}.options[{}].value", path, index),
                    "Option value is required",
                ));
            }
            if option.label.trim().is_empty() {
                violations.push(Violation::new(
                    format!("{}.options[{}].label", path, index),
                    "Option label is required",
                ));
            }
        }
    }

    if let Some(position) = &field.position {
        if position.width <= 0.0 {
            violations.push(Violation::new(
                format!("{}.position.width", path),
                "Width must be positive",
            ));
        }
        if position.height <= 0.0 {
            violations.push(Violation::new(
                format!("{}.position.height", path),
                "Height must be positive",
            ));
        }
        if position.pdf_page_no < 1 {
            violations.push(Violation::new(
                format!("{}.position.pdfPageNo", path),
                "Page number must be at least 1",
            ));
        }
    }

    if let Some(rules) = &field.validation {
        if let (Some(min), Some(max)) = (rules.min, rules.max) {
            if min > max {
                violations.push(Violation::new(
                    format!("{}.validation", path),
                    "min must not exceed max",
                ));
            }
        }
        if let (Some(min_length), Some(max_length)) = (rules.min_length, rules.max_length) {
            if min_length > max_length {
                violations.push(Violation::new(
                    format!("{}.validation", path),
                    "minLength must not exceed maxLength",
                ));
            }
        }
    }
}
