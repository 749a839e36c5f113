//! Database repository for form CRUD operations.
//!
//! Every write is a compare-and-swap on the row version, so the
//! read-modify-write cycles behind the field-scoped operations cannot lose
//! concurrent updates; they retry a bounded number of times instead.

use sqlx::{Row, SqlitePool};

use crate::db::{
    ensure_field_ids, form_from_row, merge_field_update, merge_form_update, now_rfc3339,
};
use crate::errors::AppError;
use crate::models::{
    CreateFormRequest, Form, FormField, FormPage, UpdateFieldRequest, UpdateFormRequest,
};
use crate::validation::{validate_new_form, validate_stored_form};

/// Attempts before a contended read-modify-write gives up with `Conflict`.
const CAS_MAX_ATTEMPTS: usize = 3;

const FORM_COLUMNS: &str =
    "id, name, description, pdf_url, owner_id, fields, created_at, updated_at, version";

/// Database repository for all form operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Count all stored forms, independent of any pagination window.
    pub async fn count_forms(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM forms")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("total"))
    }

    /// Create a new form: validate, assign field ids, stamp timestamps, persist.
    pub async fn create_form(&self, request: &CreateFormRequest) -> Result<Form, AppError> {
        validate_new_form(request).map_err(AppError::validation)?;

        let mut fields = request.fields.clone();
        ensure_field_ids(&mut fields);

        let id = uuid::Uuid::new_v4().to_string();
        let now = now_rfc3339();
        let fields_json = serde_json::to_string(&fields)?;

        sqlx::query(
            "INSERT INTO forms (id, name, description, pdf_url, owner_id, fields, created_at, updated_at, version) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(&id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.pdf_url)
        .bind(&request.owner_id)
        .bind(&fields_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Form {
            id,
            name: request.name.clone(),
            description: request.description.clone(),
            pdf_url: request.pdf_url.clone(),
            owner_id: request.owner_id.clone(),
            fields,
            created_at: now.clone(),
            updated_at: now,
            version: 1,
        })
    }

    /// Get a form by ID. Corrupt stored rows resolve to `None`.
    pub async fn get_form(&self, id: &str) -> Result<Option<Form>, AppError> {
        let sql = format!("SELECT {} FROM forms WHERE id = ?", FORM_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().and_then(form_from_row))
    }

    /// List forms newest-first with the store-wide total.
    ///
    /// Pages beyond the first are resolved by a keyset cursor taken from the
    /// boundary row of the previous page, so the (created_at, id) ordering
    /// key keeps pages stable while new forms arrive.
    pub async fn list_forms(&self, limit: i64, offset: i64) -> Result<FormPage, AppError> {
        let total = self.count_forms().await?;
        let limit = limit.max(0);
        let offset = offset.max(0);

        let rows = if offset == 0 {
            let sql = format!(
                "SELECT {} FROM forms ORDER BY created_at DESC, id DESC LIMIT ?",
                FORM_COLUMNS
            );
            sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?
        } else {
            let cursor = sqlx::query(
                "SELECT id, created_at FROM forms ORDER BY created_at DESC, id DESC LIMIT 1 OFFSET ?",
            )
            .bind(offset - 1)
            .fetch_optional(&self.pool)
            .await?;

            match cursor {
                Some(boundary) => {
                    let cursor_created: String = boundary.get("created_at");
                    let cursor_id: String = boundary.get("id");
                    let sql = format!(
                        "SELECT {} FROM forms \
                         WHERE created_at < ? OR (created_at = ? AND id < ?) \
                         ORDER BY created_at DESC, id DESC LIMIT ?",
                        FORM_COLUMNS
                    );
                    sqlx::query(&sql)
                        .bind(&cursor_created)
                        .bind(&cursor_created)
                        .bind(&cursor_id)
                        .bind(limit)
                        .fetch_all(&self.pool)
                        .await?
                }
                None => Vec::new(),
            }
        };

        let forms = rows.iter().filter_map(form_from_row).collect();
        Ok(FormPage { forms, total })
    }

    /// Update a form: validate-merge over the stored document, stamp
    /// `updated_at`, commit with a version check.
    pub async fn update_form(&self, id: &str, request: &UpdateFormRequest) -> Result<Form, AppError> {
        for _ in 0..CAS_MAX_ATTEMPTS {
            let existing = self
                .get_form(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Form {} not found", id)))?;

            let mut merged = merge_form_update(&existing, request);
            validate_stored_form(&merged).map_err(AppError::validation)?;

            merged.updated_at = now_rfc3339();
            merged.version = existing.version + 1;

            if self.commit_form(&merged, existing.version).await? {
                return Ok(merged);
            }
            tracing::debug!("Version moved while updating form {}, retrying", id);
        }

        Err(AppError::Conflict(format!(
            "Concurrent modification detected on form {}",
            id
        )))
    }

    /// Delete a form.
    pub async fn delete_form(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM forms WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Form {} not found", id)));
        }

        Ok(())
    }

    /// Append a field to a form, generating an id when the caller supplied none.
    pub async fn add_field(&self, form_id: &str, field: &FormField) -> Result<Form, AppError> {
        let mut field = field.clone();
        ensure_field_ids(std::slice::from_mut(&mut field));

        self.mutate_form_fields(form_id, |fields| {
            fields.push(field.clone());
            Ok(())
        })
        .await
    }

    /// Replace the matching field in place, preserving its id.
    pub async fn update_field(
        &self,
        form_id: &str,
        field_id: &str,
        request: &UpdateFieldRequest,
    ) -> Result<Form, AppError> {
        self.mutate_form_fields(form_id, |fields| {
            let slot = fields.iter_mut().find(|f| f.id == field_id).ok_or_else(|| {
                AppError::FieldNotFound(format!(
                    "Field {} not found in form {}",
                    field_id, form_id
                ))
            })?;
            *slot = merge_field_update(slot, request);
            Ok(())
        })
        .await
    }

    /// Remove the matching field. Fails with `FieldNotFound` when the id is
    /// already absent, leaving the remaining fields untouched.
    pub async fn remove_field(&self, form_id: &str, field_id: &str) -> Result<Form, AppError> {
        self.mutate_form_fields(form_id, |fields| {
            let before = fields.len();
            fields.retain(|f| f.id != field_id);
            if fields.len() == before {
                return Err(AppError::FieldNotFound(format!(
                    "Field {} not found in form {}",
                    field_id, form_id
                )));
            }
            Ok(())
        })
        .await
    }

    /// Case-insensitive substring search over name and description,
    /// newest-first, optionally pre-filtered by owner.
    pub async fn search_forms(
        &self,
        term: &str,
        owner_id: Option<&str>,
    ) -> Result<Vec<Form>, AppError> {
        if term.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rows = match owner_id {
            Some(owner) => {
                let sql = format!(
                    "SELECT {} FROM forms \
                     WHERE owner_id = ? \
                       AND (instr(lower(name), lower(?)) > 0 \
                            OR instr(lower(coalesce(description, '')), lower(?)) > 0) \
                     ORDER BY created_at DESC, id DESC",
                    FORM_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(owner)
                    .bind(term)
                    .bind(term)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM forms \
                     WHERE instr(lower(name), lower(?)) > 0 \
                        OR instr(lower(coalesce(description, '')), lower(?)) > 0 \
                     ORDER BY created_at DESC, id DESC",
                    FORM_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(term)
                    .bind(term)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.iter().filter_map(form_from_row).collect())
    }

    /// Read-modify-write over a form's field array with CAS retry.
    async fn mutate_form_fields<F>(&self, form_id: &str, mutate: F) -> Result<Form, AppError>
    where
        F: Fn(&mut Vec<FormField>) -> Result<(), AppError>,
    {
        for _ in 0..CAS_MAX_ATTEMPTS {
            let existing = self
                .get_form(form_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Form {} not found", form_id)))?;

            let mut form = existing.clone();
            mutate(&mut form.fields)?;
            validate_stored_form(&form).map_err(AppError::validation)?;

            form.updated_at = now_rfc3339();
            form.version = existing.version + 1;

            if self.commit_form(&form, existing.version).await? {
                return Ok(form);
            }
            tracing::debug!("Version moved while mutating fields of form {}, retrying", form_id);
        }

        Err(AppError::Conflict(format!(
            "Concurrent modification detected on form {}",
            form_id
        )))
    }

    /// Conditional UPDATE on the expected version. Returns false on a miss.
    async fn commit_form(&self, form: &Form, expected_version: i64) -> Result<bool, AppError> {
        let fields_json = serde_json::to_string(&form.fields)?;

        let result = sqlx::query(
            "UPDATE forms SET name = ?, description = ?, pdf_url = ?, owner_id = ?, fields = ?, updated_at = ?, version = ? \
             WHERE id = ? AND version = ?",
        )
        .bind(&form.name)
        .bind(&form.description)
        .bind(&form.pdf_url)
        .bind(&form.owner_id)
        .bind(&fields_json)
        .bind(&form.updated_at)
        .bind(form.version)
        .bind(&form.id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
