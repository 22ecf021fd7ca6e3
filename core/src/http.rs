//! HTTP request/response model and the transport seam.
//!
//! # Design
//! Requests and responses are plain data. The `Transport` trait performs one
//! round-trip and nothing else: non-2xx statuses come back as ordinary
//! responses, and only failures below HTTP (timeouts, refused connections,
//! broken bodies) are errors. Classification and retry belong to `ApiClient`,
//! which keeps them testable with a scripted transport.
//!
//! All fields use owned types so a request can be logged, retried and
//! inspected without lifetime concerns.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, RequestBuilder};

use crate::error::ApiClientError;

/// Upper bound on a response body read by `UreqTransport`. ureq's own
/// default (10 MiB) would turn a large 2xx answer into a transport failure.
pub const MAX_RESPONSE_BODY: u64 = u64::MAX;

/// Query parameters or header overrides. Keys are unique.
pub type Params = BTreeMap<String, String>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base URL plus the headers sent when a call brings no overrides.
///
/// Immutable once built; an `ApiClient` owns exactly one.
#[derive(Debug, Clone)]
pub struct Endpoint {
    base_url: String,
    headers: Params,
}

impl Endpoint {
    /// Endpoint with `Content-Type` and `Accept` set to `application/json`.
    pub fn new(base_url: &str) -> Self {
        let headers = [
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ]
        .into_iter()
        .collect();
        Self::with_headers(base_url, headers)
    }

    pub fn with_headers(base_url: &str, headers: Params) -> Self {
        Self {
            base_url: base_url.to_string(),
            headers,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn headers(&self) -> &Params {
        &self.headers
    }
}

/// One HTTP request, fully resolved: absolute URL, final headers, encoded body.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiClientError> {
        serde_json::from_slice(&self.body).map_err(|e| ApiClientError::Client {
            message: format!("failed to decode response body: {e}"),
        })
    }
}

/// Failure below the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Timeout,
    Other(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "request timed out"),
            TransportError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// Executes one HTTP round-trip.
///
/// Implementations must return every status code as `Ok`; `Err` is reserved
/// for failures where no complete response was received.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// `timeout` bounds the whole call, connect through body.
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let body = request.body.as_deref();
        let result = match request.method {
            HttpMethod::Get => send_without_body(prepare(self.agent.get(url), request), body),
            HttpMethod::Delete => send_without_body(prepare(self.agent.delete(url), request), body),
            HttpMethod::Post => send_with_body(prepare(self.agent.post(url), request), body),
            HttpMethod::Put => send_with_body(prepare(self.agent.put(url), request), body),
        };

        let mut response = result.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BODY)
            .read_to_vec()
            .map_err(classify)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn prepare<B>(builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
    let builder = request
        .query
        .iter()
        .fold(builder, |b, (k, v)| b.query(k, v));
    request
        .headers
        .iter()
        .fold(builder, |b, (k, v)| b.header(k.as_str(), v.as_str()))
}

fn send_without_body(
    builder: RequestBuilder<WithoutBody>,
    body: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.force_send_body().send(body.as_bytes()),
        None => builder.call(),
    }
}

fn send_with_body(
    builder: RequestBuilder<WithBody>,
    body: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

fn classify(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(ref e) if e.kind() == io::ErrorKind::TimedOut => TransportError::Timeout,
        other => TransportError::Other(other.to_string()),
    }
}
