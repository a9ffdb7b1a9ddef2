//! Single-hop forwarding to one backend.
//!
//! # Responsibilities
//! - Hold a replayable copy of the inbound request
//! - Rewrite the URI onto the backend's scheme and authority
//! - Strip hop-by-hop headers and record the client in X-Forwarded-For
//! - Send it with the shared hyper client under a per-attempt deadline
//!
//! # Design Decisions
//! - HTTP error statuses are responses, not errors
//! - Only transport failures and timeouts surface as `ForwardError`
//! - The transport is a trait object so dispatch can be tested with fakes

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{HeaderMap, Method, Request, Response, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::resilience::timeouts::with_deadline;
use crate::security::headers::{append_forwarded_for, strip_hop_by_hop};

/// A buffered inbound request that can be sent more than once.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Peer address of the client connection, when known.
    pub client_addr: Option<SocketAddr>,
}

impl ForwardRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            client_addr: None,
        }
    }

    pub fn with_client_addr(mut self, client_addr: SocketAddr) -> Self {
        self.client_addr = Some(client_addr);
        self
    }

    /// Build the outbound request for the given backend.
    pub fn to_backend_request(&self, target: &Url) -> Result<Request<Body>, ForwardError> {
        let mut uri_parts = self.uri.clone().into_parts();
        uri_parts.scheme = Some(
            Scheme::from_str(target.scheme()).map_err(|e| ForwardError::Request(e.to_string()))?,
        );
        uri_parts.authority = Some(
            Authority::from_str(&authority_of(target))
                .map_err(|e| ForwardError::Request(e.to_string()))?,
        );
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        let uri = Uri::from_parts(uri_parts).map_err(|e| ForwardError::Request(e.to_string()))?;

        let mut request = Request::builder()
            .method(self.method.clone())
            .uri(uri)
            .body(Body::from(self.body.clone()))
            .map_err(|e| ForwardError::Request(e.to_string()))?;

        let headers = request.headers_mut();
        *headers = self.headers.clone();
        strip_hop_by_hop(headers);
        if let Some(client) = self.client_addr {
            append_forwarded_for(headers, client.ip());
        }

        Ok(request)
    }
}

/// `host:port` of a backend URL, with the scheme's default port filled in.
pub fn authority_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port_or_known_default() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Transport-level forwarding failure.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("connection to backend failed: {0}")]
    Connect(String),

    #[error("backend did not answer within {0:?}")]
    Timeout(Duration),

    #[error("could not build backend request: {0}")]
    Request(String),
}

/// Capability to forward one request to one backend.
#[async_trait]
pub trait Forward: Send + Sync + fmt::Debug {
    async fn forward(
        &self,
        target: &Url,
        request: &ForwardRequest,
    ) -> Result<Response<Body>, ForwardError>;
}

/// Hyper-backed forwarder shared by every backend in the pool.
#[derive(Debug, Clone)]
pub struct HyperForwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl HyperForwarder {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, timeout }
    }
}

#[async_trait]
impl Forward for HyperForwarder {
    async fn forward(
        &self,
        target: &Url,
        request: &ForwardRequest,
    ) -> Result<Response<Body>, ForwardError> {
        let outbound = request.to_backend_request(target)?;
        let response = with_deadline(self.timeout, self.client.request(outbound))
            .await
            .map_err(|_| ForwardError::Timeout(self.timeout))?
            .map_err(|e| ForwardError::Connect(e.to_string()))?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
