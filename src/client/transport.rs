//! Typed HTTP transport for the form API.
//!
//! Wraps `reqwest` with the envelope contract of the server: success bodies
//! are unwrapped to their payload, failure bodies are mapped back onto the
//! `AppError` taxonomy, and transport-level failures become `Network`.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::{codes, AppError, Violation};
use crate::models::{
    CreateFormRequest, Form, FormField, FormPage, UpdateFieldRequest, UpdateFormRequest,
};

/// Client-side request timeout; a hung server turns into a reported error.
const REQUEST_TIMEOUT_SECS: u64 = 8;

/// Wire shape of both envelope variants.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    code: String,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

/// Typed client for the `/api/forms` endpoint.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client against a server base URL (no trailing slash needed).
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| AppError::Network(format!("Failed to build HTTP client: {}", err)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/forms", self.base_url)
    }

    /// GET a page of forms plus the store-wide total.
    pub async fn list_forms(&self, limit: i64, offset: i64) -> Result<FormPage, AppError> {
        let response = self
            .http
            .get(self.endpoint())
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await
            .map_err(network_error)?;
        decode(response).await
    }

    /// GET a single form by id.
    pub async fn get_form(&self, id: &str) -> Result<Form, AppError> {
        let response = self
            .http
            .get(self.endpoint())
            .query(&[("id", id)])
            .send()
            .await
            .map_err(network_error)?;
        decode(response).await
    }

    /// GET forms matching a search term, optionally owner-scoped.
    pub async fn search_forms(
        &self,
        term: &str,
        owner_id: Option<&str>,
    ) -> Result<Vec<Form>, AppError> {
        let mut request = self.http.get(self.endpoint()).query(&[("q", term)]);
        if let Some(owner) = owner_id {
            request = request.query(&[("ownerId", owner)]);
        }
        let response = request.send().await.map_err(network_error)?;
        decode(response).await
    }

    /// POST a new form.
    pub async fn create_form(&self, request: &CreateFormRequest) -> Result<Form, AppError> {
        let response = self
            .http
            .post(self.endpoint())
            .json(request)
            .send()
            .await
            .map_err(network_error)?;
        decode(response).await
    }

    /// PUT a partial update to a form.
    pub async fn update_form(
        &self,
        id: &str,
        request: &UpdateFormRequest,
    ) -> Result<Form, AppError> {
        let response = self
            .http
            .put(self.endpoint())
            .query(&[("id", id)])
            .json(request)
            .send()
            .await
            .map_err(network_error)?;
        decode(response).await
    }

    /// DELETE a form.
    pub async fn delete_form(&self, id: &str) -> Result<(), AppError> {
        let response = self
            .http
            .delete(self.endpoint())
            .query(&[("id", id)])
            .send()
            .await
            .map_err(network_error)?;
        decode_message(response).await
    }

    /// PUT action=addField: append a field to a form.
    pub async fn add_field(&self, form_id: &str, field: &FormField) -> Result<Form, AppError> {
        let response = self
            .http
            .put(self.endpoint())
            .query(&[("id", form_id), ("action", "addField")])
            .json(field)
            .send()
            .await
            .map_err(network_error)?;
        decode(response).await
    }

    /// PUT action=updateField: merge a partial update into one field.
    pub async fn update_field(
        &self,
        form_id: &str,
        field_id: &str,
        request: &UpdateFieldRequest,
    ) -> Result<Form, AppError> {
        let response = self
            .http
            .put(self.endpoint())
            .query(&[
                ("id", form_id),
                ("action", "updateField"),
                ("fieldId", field_id),
            ])
            .json(request)
            .send()
            .await
            .map_err(network_error)?;
        decode(response).await
    }

    /// DELETE action=removeField: drop one field from a form.
    pub async fn remove_field(&self, form_id: &str, field_id: &str) -> Result<Form, AppError> {
        let response = self
            .http
            .delete(self.endpoint())
            .query(&[
                ("id", form_id),
                ("action", "removeField"),
                ("fieldId", field_id),
            ])
            .send()
            .await
            .map_err(network_error)?;
        decode(response).await
    }
}

fn network_error(err: reqwest::Error) -> AppError {
    AppError::Network(format!("Request failed: {}", err))
}

/// Unwrap a data-carrying envelope.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AppError> {
    let envelope: Envelope<T> = response
        .json()
        .await
        .map_err(|err| AppError::Network(format!("Malformed response body: {}", err)))?;

    if envelope.success {
        envelope
            .data
            .ok_or_else(|| AppError::Internal("Response envelope is missing data".to_string()))
    } else {
        Err(error_from_envelope(envelope.message, envelope.error))
    }
}

/// Unwrap a message-only envelope (delete).
async fn decode_message(response: reqwest::Response) -> Result<(), AppError> {
    let envelope: Envelope<serde_json::Value> = response
        .json()
        .await
        .map_err(|err| AppError::Network(format!("Malformed response body: {}", err)))?;

    if envelope.success {
        Ok(())
    } else {
        Err(error_from_envelope(envelope.message, envelope.error))
    }
}

/// Map an error envelope back onto the shared taxonomy.
fn error_from_envelope(message: Option<String>, error: Option<EnvelopeError>) -> AppError {
    let message = message.unwrap_or_else(|| "Request failed".to_string());
    let Some(error) = error else {
        return AppError::Internal(message);
    };

    match error.code.as_str() {
        codes::NOT_FOUND => AppError::NotFound(message),
        codes::FIELD_NOT_FOUND => AppError::FieldNotFound(message),
        codes::VALIDATION_ERROR => {
            let violations: Vec<Violation> = error
                .details
                .and_then(|details| serde_json::from_value(details).ok())
                .unwrap_or_default();
            AppError::Validation {
                message,
                violations,
            }
        }
        codes::CONFLICT => AppError::Conflict(message),
        codes::DATABASE_ERROR => AppError::Database(message),
        codes::BAD_REQUEST => AppError::BadRequest(message),
        _ => AppError::Internal(message),
    }
}
