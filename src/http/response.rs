//! Response handling.
//!
//! # Responsibilities
//! - Map dispatch failures to client-facing status codes
//!
//! # Design Decisions
//! - Backend responses, error statuses included, are passed through untouched
//! - The only failure a client sees is a generic 503; no backend addresses,
//!   retry counts or error details leak out

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::dispatch::DispatchError;

pub const SERVICE_UNAVAILABLE_BODY: &str = "Service not available";

pub fn service_unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, SERVICE_UNAVAILABLE_BODY).into_response()
}

pub fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, "Malformed request body").into_response()
}

pub fn payload_too_large() -> Response {
    (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response()
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        service_unavailable()
    }
}
