//! Retrying JSON API client and layered configuration for test suites.
//!
//! # Overview
//! A `ConfigResolver` answers settings from the environment, a loaded
//! JSON/YAML/TOML file, or a default. An `ApiClient` bound to one base URL
//! sends GET/POST/PUT/DELETE requests through a single retrying path and
//! reports failures as typed `ApiClientError` values.
//!
//! # Design
//! - Nothing is global: `Environment`, `ConfigResolver` and `ApiClient` are
//!   built by the entry point and passed down. `logging::init` is explicit.
//! - The network sits behind the `Transport` trait; `UreqTransport` is the
//!   real one, tests script their own.
//! - Retry is blind by default (any failure, three attempts, two seconds
//!   apart); `RetryPolicy::retry_if` narrows it.

pub mod client;
pub mod config;
pub mod env;
pub mod error;
pub mod http;
pub mod logging;
pub mod retry;
pub mod services;

pub use client::{ApiClient, BASE_URL_KEY, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use config::{ConfigFormat, ConfigResolver, ConfigStore, ConfigType};
pub use env::Environment;
pub use error::{ApiClientError, ConfigError, Error};
pub use http::{Endpoint, HttpMethod, HttpRequest, HttpResponse, Params, Transport, TransportError, UreqTransport};
pub use retry::RetryPolicy;
pub use services::{ProductService, UserService};
