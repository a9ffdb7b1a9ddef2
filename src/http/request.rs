//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID) and echo it back
//! - Buffer the body so a request can be replayed on retry
//! - Enforce the body size limit before forwarding
//! - Carry the client's peer address for X-Forwarded-For
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The whole body is read once; every attempt reuses the same bytes

use std::error::Error as StdError;
use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderName, Request};
use http_body_util::LengthLimitError;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::http::forward::ForwardRequest;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layer that assigns an `x-request-id` when the client sent none.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer that copies the request's `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Read the request ID set by [`set_request_id_layer`].
pub fn request_id(request: &Request<Body>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Why an inbound body could not be buffered.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body exceeds {0} bytes")]
    TooLarge(usize),

    #[error("request body could not be read: {0}")]
    Unreadable(axum::Error),
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// Buffer an inbound request into a replayable [`ForwardRequest`].
pub async fn buffer_request(
    request: Request<Body>,
    max_body_bytes: usize,
) -> Result<ForwardRequest, BodyError> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, max_body_bytes)
        .await
        .map_err(|e| {
            if is_length_limit(&e) {
                BodyError::TooLarge(max_body_bytes)
            } else {
                BodyError::Unreadable(e)
            }
        })?;

    let client = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let forward = ForwardRequest::new(parts.method, parts.uri, parts.headers, body);
    Ok(match client {
        Some(addr) => forward.with_client_addr(addr),
        None => forward,
    })
}
