//! Request extraction.

use crate::WebError;
use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use sliver_core::{RequestInfo, SliverError};

/// Extracts a [`RequestInfo`], including url-encoded form parameters.
///
/// Consumes the body, so it must be the last extractor of a handler. The
/// body size limit is axum's `DefaultBodyLimit` (2 MiB unless a layer
/// changes it); larger bodies are rejected with 413.
#[derive(Debug, Clone)]
pub struct PartialRequest(pub RequestInfo);

#[async_trait]
impl<S> FromRequest<S> for PartialRequest
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let info = RequestInfo::from_parts(&parts, &[]);

        let bytes = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|rejection| {
                let message = format!("Failed to read body: {}", rejection.body_text());
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    SliverError::PayloadTooLarge(message)
                } else {
                    SliverError::BadRequest(message)
                }
            })?;

        Ok(Self(info.with_body(&bytes)))
    }
}
