use crate::common::media_types;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Wire-level error payload
///
/// Every error response produced by this crate carries this body.
///
/// # Example
/// ```
/// use springwheel::common::ErrorResult;
/// use axum::http::StatusCode;
///
/// let response = ErrorResult::new(40401, "widget 9 not found")
///     .into_response_with(StatusCode::NOT_FOUND);
/// assert_eq!(response.status(), StatusCode::NOT_FOUND);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub code: i32,
    pub message: String,
}

/// Marks a response whose body is an [`ErrorResult`], so the exception layer does not
/// treat it as a framework-produced error.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RenderedErrorResult;

impl ErrorResult {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The generic body used for every unclassified failure.
    pub fn internal_server_error() -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        Self::new(
            i32::from(status.as_u16()),
            status.canonical_reason().unwrap_or("Internal Server Error"),
        )
    }

    /// Render with an explicit HTTP status.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        let mut response = (
            status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(media_types::JSON_UTF_8),
            )],
            Json(self),
        )
            .into_response();
        response.extensions_mut().insert(RenderedErrorResult);
        response
    }
}

impl IntoResponse for ErrorResult {
    /// Uses `code` as the status when it is a valid HTTP status, 500 otherwise.
    fn into_response(self) -> Response {
        let status = u16::try_from(self.code)
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.into_response_with(status)
    }
}
