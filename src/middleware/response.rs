//! Success envelope for handler results.
//!
//! Every successful reply has the shape `{ "success": true, "data": ... }`.
//! Failures go through [`ApiError`], which renders the matching
//! `{ "success": false, "error", "code" }` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status: StatusCode,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    success: bool,
    data: &'a T,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with `data`.
    pub fn success(data: T) -> Self {
        Self { data, status: StatusCode::OK }
    }

    /// 201, used by every create endpoint.
    pub fn created(data: T) -> Self {
        Self { data, status: StatusCode::CREATED }
    }
}

impl ApiResponse<()> {
    /// 200 with `data: null`, for mutations that return nothing.
    pub fn empty() -> Self {
        Self::success(())
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let envelope = Envelope { success: true, data: &self.data };
        // Serialize up front so a bad payload still yields a JSON error body
        match serde_json::to_value(&envelope) {
            Ok(body) => (self.status, Json(body)).into_response(),
            Err(err) => {
                tracing::error!("Failed to serialize response data: {}", err);
                ApiError::internal_server_error("Failed to serialize response data").into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
