//! HTTP error response handling
//!
//! Domain errors become plain-text responses: the status comes from
//! [`ToHttpStatus`], the body is the error's message, and the machine-readable
//! code travels in the `X-Error-Code` header.

use crate::error::{Error, ToHttpStatus};
use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

/// Header carrying [`ToHttpStatus::error_code`]
pub const ERROR_CODE_HEADER: &str = "x-error-code";

/// Implement IntoResponse for Error to automatically convert errors to HTTP responses
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code.is_server_error() {
            tracing::error!(status = status_code.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status_code.as_u16(), error = %self, "request rejected");
        }

        let code = HeaderValue::from_str(self.error_code())
            .unwrap_or_else(|_| HeaderValue::from_static("internal_error"));

        (
            status_code,
            [
                (
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                ),
                (header::HeaderName::from_static(ERROR_CODE_HEADER), code),
            ],
            self.to_string(),
        )
            .into_response()
    }
}
