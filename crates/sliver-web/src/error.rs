//! Mapping of rendering failures onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sliver_core::SliverError;
use tracing::{error, warn};

/// A [`SliverError`] surfaced through an axum handler.
#[derive(Debug)]
pub struct WebError(pub SliverError);

impl From<SliverError> for WebError {
    fn from(err: SliverError) -> Self {
        Self(err)
    }
}

impl WebError {
    /// Status code for the wrapped error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            err if err.is_not_found() => StatusCode::NOT_FOUND,
            SliverError::BadRequest(_) => StatusCode::BAD_REQUEST,
            SliverError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
            return (status, "Internal Server Error").into_response();
        }

        warn!("Request rejected ({}): {}", status, self.0);
        (status, self.0.to_string()).into_response()
    }
}
