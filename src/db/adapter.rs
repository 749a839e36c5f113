//! Conversion between the public form shapes and the stored row layout.
//!
//! Owns field id generation, timestamp stamping, and the on-read
//! re-validation that keeps corrupt rows from leaking out half-parsed.

use chrono::Utc;
use sqlx::Row;

use crate::models::{Form, FormField, UpdateFieldRequest, UpdateFormRequest};
use crate::validation::validate_stored_form;

/// Current server time in the portable RFC 3339 form used on the wire.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Assign a fresh id to every field lacking one. Idempotent: fields that
/// already carry an id pass through unchanged.
pub fn ensure_field_ids(fields: &mut [FormField]) {
    for field in fields.iter_mut() {
        if field.id.trim().is_empty() {
            field.id = uuid::Uuid::new_v4().to_string();
        }
    }
}

/// Reassemble a stored row into a `Form`, re-validating before returning.
///
/// A row whose field JSON no longer parses, or that fails schema
/// re-validation, is warn-logged and dropped (`None`) so read paths report
/// it as not found instead of returning it partially.
pub fn form_from_row(row: &sqlx::sqlite::SqliteRow) -> Option<Form> {
    let id: String = row.get("id");
    let fields_json: String = row.get("fields");

    let fields: Vec<FormField> = match serde_json::from_str(&fields_json) {
        Ok(fields) => fields,
        Err(err) => {
            tracing::warn!("Stored fields of form {} do not parse: {}", id, err);
            return None;
        }
    };

    let form = Form {
        id,
        name: row.get("name"),
        description: row.get("description"),
        pdf_url: row.get("pdf_url"),
        owner_id: row.get("owner_id"),
        fields,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    };

    if let Err(violations) = validate_stored_form(&form) {
        tracing::warn!(
            "Stored form {} fails re-validation ({} violation(s)); treating as missing",
            form.id,
            violations.len()
        );
        return None;
    }

    Some(form)
}

/// Merge an update request over an existing form.
///
/// Only the mutable attributes participate; `id`, `created_at` and `version`
/// always come from the stored document. When the request replaces the field
/// array, missing field ids are filled in.
pub fn merge_form_update(existing: &Form, request: &UpdateFormRequest) -> Form {
    let mut fields = request.fields.clone().unwrap_or_else(|| existing.fields.clone());
    if request.fields.is_some() {
        ensure_field_ids(&mut fields);
    }

    Form {
        id: existing.id.clone(),
        name: request.name.clone().unwrap_or_else(|| existing.name.clone()),
        description: request.description.clone().or_else(|| existing.description.clone()),
        pdf_url: request
            .pdf_url
            .clone()
            .unwrap_or_else(|| existing.pdf_url.clone()),
        owner_id: request.owner_id.clone().or_else(|| existing.owner_id.clone()),
        fields,
        created_at: existing.created_at.clone(),
        updated_at: existing.updated_at.clone(),
        version: existing.version,
    }
}

/// Merge a partial field update over an existing field, preserving its id.
pub fn merge_field_update(existing: &FormField, request: &UpdateFieldRequest) -> FormField {
    FormField {
        id: existing.id.clone(),
        name: request.name.clone().unwrap_or_else(|| existing.name.clone()),
        label: request
            .label
            .clone()
            .unwrap_or_else(|| existing.label.clone()),
        field_type: request.field_type.unwrap_or(existing.field_type),
        required: request.required.unwrap_or(existing.required),
        placeholder: request
            .placeholder
            .clone()
            .or_else(|| existing.placeholder.clone()),
        options: request.options.clone().or_else(|| existing.options.clone()),
        position: request
            .position
            .clone()
            .or_else(|| existing.position.clone()),
        validation: request
            .validation
            .clone()
            .or_else(|| existing.validation.clone()),
    }
}
