//! REST API module.
//!
//! Contains the `/api/forms` dispatch handlers and the uniform response
//! envelope shared with the client transport.

mod forms;

pub use forms::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Success response envelope: `{success: true, data?, message?}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppError>;

/// Create a successful 200 response carrying a payload.
pub fn success<T: Serialize>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data: Some(data),
        message: None,
        status: StatusCode::OK,
    }
}

/// Create a 201 response for newly persisted resources.
pub fn created<T: Serialize>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data: Some(data),
        message: None,
        status: StatusCode::CREATED,
    }
}

/// Create a payload-free 200 response carrying only a message.
pub fn message(text: impl Into<String>) -> ApiResponse<()> {
    ApiResponse {
        success: true,
        data: None,
        message: Some(text.into()),
        status: StatusCode::OK,
    }
}
