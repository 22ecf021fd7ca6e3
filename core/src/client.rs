//! Retrying request executor bound to one endpoint.
//!
//! # Design
//! Every verb funnels into `execute`, which builds one `HttpRequest` and
//! replays it under the `RetryPolicy`. Each attempt is classified on its own:
//! a 2xx response ends the loop at once, a non-2xx response becomes
//! `ApiClientError::Request`, a transport timeout `Timeout`, and anything
//! else `Client`. When the policy says stop, the last classified failure is
//! returned unchanged.
//!
//! `ApiClient` holds no mutable state. The endpoint is immutable and the
//! transport is shared behind an `Arc`, so one client can serve many threads.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::config::ConfigResolver;
use crate::error::{ApiClientError, ConfigError};
use crate::http::{
    Endpoint, HttpMethod, HttpRequest, HttpResponse, Params, Transport, TransportError,
    UreqTransport,
};
use crate::retry::RetryPolicy;

/// Timeout applied to every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Config key holding the service base URL.
pub const BASE_URL_KEY: &str = "API_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

#[derive(Clone)]
pub struct ApiClient {
    endpoint: Endpoint,
    timeout: Duration,
    retry: RetryPolicy,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client for `base_url` with JSON default headers, the default retry
    /// policy and a `ureq` transport.
    pub fn new(base_url: &str) -> Self {
        Self::with_endpoint(Endpoint::new(base_url))
    }

    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            transport: Arc::new(UreqTransport::new(DEFAULT_TIMEOUT)),
        }
    }

    /// Client for the base URL stored under `API_BASE_URL`, falling back to
    /// `http://localhost:5000`.
    pub fn from_config(config: &ConfigResolver) -> Result<Self, ConfigError> {
        let base_url = config
            .get::<String>(BASE_URL_KEY, Some(DEFAULT_BASE_URL.to_string()))?
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(&base_url))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve the request a call to `execute` would send.
    ///
    /// The URL is the base URL followed by `path` verbatim. Non-empty
    /// `headers` replace the endpoint defaults entirely.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        params: Option<&Params>,
        body: Option<&Value>,
        headers: Option<&Params>,
    ) -> Result<HttpRequest, ApiClientError> {
        let headers = headers
            .filter(|h| !h.is_empty())
            .unwrap_or(self.endpoint.headers());
        let body = body
            .map(|b| serde_json::to_string(b).map_err(serialization_error))
            .transpose()?;

        Ok(HttpRequest {
            method,
            url: format!("{}{}", self.endpoint.base_url(), path),
            query: params
                .map(|p| p.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            body,
        })
    }

    /// Send a request, retrying under the client's policy.
    pub fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        params: Option<&Params>,
        body: Option<&Value>,
        headers: Option<&Params>,
    ) -> Result<HttpResponse, ApiClientError> {
        let request = self.build_request(method, path, params, body, headers)?;
        let request_id = Uuid::new_v4();
        let span = info_span!("api_request", %request_id, %method, url = %request.url);
        let _guard = span.enter();

        let mut attempt = 1;
        loop {
            match self.attempt(&request, attempt) {
                Ok(response) => return Ok(response),
                Err(err) if self.retry.should_retry(attempt, &err) => {
                    warn!(
                        attempt,
                        delay_ms = self.retry.delay().as_millis() as u64,
                        error = %err,
                        "retrying request"
                    );
                    thread::sleep(self.retry.delay());
                    attempt += 1;
                }
                Err(err) => {
                    error!(attempt, error = %err, "request failed, giving up");
                    return Err(err);
                }
            }
        }
    }

    pub fn get(&self, path: &str, params: Option<&Params>) -> Result<HttpResponse, ApiClientError> {
        self.execute(HttpMethod::Get, path, params, None, None)
    }

    pub fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<HttpResponse, ApiClientError> {
        let body = serde_json::to_value(body).map_err(serialization_error)?;
        self.execute(HttpMethod::Post, path, None, Some(&body), None)
    }

    pub fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<HttpResponse, ApiClientError> {
        let body = serde_json::to_value(body).map_err(serialization_error)?;
        self.execute(HttpMethod::Put, path, None, Some(&body), None)
    }

    pub fn delete(&self, path: &str, params: Option<&Params>) -> Result<HttpResponse, ApiClientError> {
        self.execute(HttpMethod::Delete, path, params, None, None)
    }

    fn attempt(&self, request: &HttpRequest, attempt: u32) -> Result<HttpResponse, ApiClientError> {
        info!(
            attempt,
            params = ?request.query,
            body = request.body.as_deref().unwrap_or(""),
            "making request"
        );
        let err = match self.transport.send(request) {
            Ok(response) if response.is_success() => {
                info!(attempt, status = response.status, "request succeeded");
                return Ok(response);
            }
            Ok(response) => {
                error!(attempt, status = response.status, "HTTP error response");
                ApiClientError::Request {
                    status_code: response.status,
                    response_message: status_message(&response, &request.url),
                }
            }
            Err(TransportError::Timeout) => {
                error!(attempt, "request timed out");
                ApiClientError::Timeout {
                    timeout_value: self.timeout.as_secs(),
                }
            }
            Err(TransportError::Other(msg)) => {
                error!(attempt, error = %msg, "request transport failure");
                ApiClientError::Client {
                    message: format!("an error occurred with the request: {msg}"),
                }
            }
        };
        Err(err)
    }
}

/// `"<code> <reason> for url: <url>"`, followed by the body text if any.
fn status_message(response: &HttpResponse, url: &str) -> String {
    let reason = ureq::http::StatusCode::from_u16(response.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status");
    let body = response.text();
    let body = body.trim();
    if body.is_empty() {
        format!("{} {reason} for url: {url}", response.status)
    } else {
        format!("{} {reason} for url: {url}: {body}", response.status)
    }
}

fn serialization_error(err: serde_json::Error) -> ApiClientError {
    error!(error = %err, "failed to serialize request body");
    ApiClientError::Client {
        message: format!("failed to serialize request body: {err}"),
    }
}
