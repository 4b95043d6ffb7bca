//! Error-to-response mapping.

use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    tracing::error,
};

use tgrelay_common::Error;

/// Wrapper turning the shared error taxonomy into HTTP responses:
/// client errors → 400, missing session → 404, everything else → 500 with
/// the cause surfaced verbatim.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client() {
            StatusCode::BAD_REQUEST
        } else if matches!(self.0, Error::SessionNotFound(_)) {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }

        let body = Json(serde_json::json!({ "detail": self.0.to_string() }));
        (status, body).into_response()
    }
}
