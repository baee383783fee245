//! Response mapping.
//!
//! # Responsibilities
//! - Turn a dispatch payload into 200 (JSON, gzipped on request) or 204
//! - Map [`RequestError`] kinds to HTTP status codes
//!
//! # Status Mapping
//! ```text
//! Ok(empty)                     → 204 No Content
//! Ok(bytes)                     → 200 application/json
//! error carrying a CodedError   → the carried code
//! RouteNotFound                 → 404
//! any other RequestError        → 400
//! ```

use std::io::Write;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use flate2::{write::GzEncoder, Compression};

use crate::error::{ErrorKind, RequestError};

/// Status code for a failed dispatch.
pub fn status_for(err: &RequestError) -> StatusCode {
    if let Some(status) = err.code().and_then(|code| StatusCode::from_u16(code).ok()) {
        return status;
    }
    match err.kind() {
        ErrorKind::RouteNotFound => StatusCode::NOT_FOUND,
        ErrorKind::DecodeError
        | ErrorKind::HandlerError
        | ErrorKind::EncodeError
        | ErrorKind::UnsupportedContentType
        | ErrorKind::ReadBodyError => StatusCode::BAD_REQUEST,
    }
}

/// Response for a successful dispatch. A non-empty payload is gzipped at
/// `gzip_level` when one is given.
pub fn payload_response(payload: Vec<u8>, gzip_level: Option<u32>) -> Response {
    if payload.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }

    let json = (header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(level) = gzip_level {
        match gzip(&payload, level) {
            Ok(compressed) => {
                return (
                    [json, (header::CONTENT_ENCODING, HeaderValue::from_static("gzip"))],
                    compressed,
                )
                    .into_response();
            }
            Err(e) => tracing::warn!(error = %e, "Failed to compress response, sending it plain"),
        }
    }
    ([json], payload).into_response()
}

fn gzip(payload: &[u8], level: u32) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(payload)?;
    encoder.finish()
}

/// Plain-text response for a failed dispatch.
pub fn error_response(err: &RequestError) -> Response {
    (status_for(err), err.to_string()).into_response()
}
