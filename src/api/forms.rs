//! Form collection endpoint.
//!
//! A single `/api/forms` route dispatches on HTTP verb plus the `id`,
//! `action` and `fieldId` query parameters. Every arm is an explicit match
//! that returns; unknown actions are rejected up front.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::{created, message, success};
use crate::errors::AppError;
use crate::models::{CreateFormRequest, FormField, UpdateFieldRequest, UpdateFormRequest};
use crate::AppState;

/// Query parameters understood by the collection endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormQuery {
    /// Form id; switches GET/PUT/DELETE from collection to document scope.
    #[serde(default)]
    pub id: Option<String>,
    /// Field-scoped sub-operation: addField, updateField, removeField.
    #[serde(default)]
    pub action: Option<String>,
    /// Field id for updateField/removeField.
    #[serde(default)]
    pub field_id: Option<String>,
    /// Page size for listing (default: 10).
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Rows to skip for listing (default: 0).
    #[serde(default)]
    pub offset: i64,
    /// Free-text search term over name/description.
    #[serde(default)]
    pub q: Option<String>,
    /// Owner pre-filter for search.
    #[serde(default)]
    pub owner_id: Option<String>,
}

fn default_limit() -> i64 {
    10
}

/// GET /api/forms - get by id, search, or list a page.
pub async fn get_forms(
    State(state): State<AppState>,
    Query(params): Query<FormQuery>,
) -> Result<Response, AppError> {
    match (&params.id, &params.q) {
        (Some(id), _) => {
            let form = state
                .repo
                .get_form(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Form {} not found", id)))?;
            Ok(success(form).into_response())
        }
        (None, Some(q)) => {
            let forms = state
                .repo
                .search_forms(q, params.owner_id.as_deref())
                .await?;
            Ok(success(forms).into_response())
        }
        (None, None) => {
            let page = state.repo.list_forms(params.limit, params.offset).await?;
            Ok(success(page).into_response())
        }
    }
}

/// POST /api/forms - create a new form.
pub async fn create_form(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, AppError> {
    let request: CreateFormRequest = serde_json::from_value(body)?;
    let form = state.repo.create_form(&request).await?;
    Ok(created(form).into_response())
}

/// PUT /api/forms?id= - update a form, or one of its fields via `action`.
pub async fn update_form(
    State(state): State<AppState>,
    Query(params): Query<FormQuery>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, AppError> {
    let id = require_id(&params)?;

    match params.action.as_deref() {
        None => {
            let request: UpdateFormRequest = serde_json::from_value(body)?;
            let form = state.repo.update_form(id, &request).await?;
            Ok(success(form).into_response())
        }
        Some("addField") => {
            let field: FormField = serde_json::from_value(body)?;
            let form = state.repo.add_field(id, &field).await?;
            Ok(success(form).into_response())
        }
        Some("updateField") => {
            let field_id = require_field_id(&params)?;
            let request: UpdateFieldRequest = serde_json::from_value(body)?;
            let form = state.repo.update_field(id, field_id, &request).await?;
            Ok(success(form).into_response())
        }
        Some(other) => Err(AppError::BadRequest(format!(
            "Unknown action {} for PUT",
            other
        ))),
    }
}

/// DELETE /api/forms?id= - delete a form, or remove one field via `action`.
pub async fn delete_form(
    State(state): State<AppState>,
    Query(params): Query<FormQuery>,
) -> Result<Response, AppError> {
    let id = require_id(&params)?;

    match params.action.as_deref() {
        None => {
            state.repo.delete_form(id).await?;
            Ok(message(format!("Form {} deleted", id)).into_response())
        }
        Some("removeField") => {
            let field_id = require_field_id(&params)?;
            let form = state.repo.remove_field(id, field_id).await?;
            Ok(success(form).into_response())
        }
        Some(other) => Err(AppError::BadRequest(format!(
            "Unknown action {} for DELETE",
            other
        ))),
    }
}

fn require_id(params: &FormQuery) -> Result<&str, AppError> {
    params
        .id
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Query parameter id is required".to_string()))
}

fn require_field_id(params: &FormQuery) -> Result<&str, AppError> {
    params
        .field_id
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Query parameter fieldId is required".to_string()))
}
