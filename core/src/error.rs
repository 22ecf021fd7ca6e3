//! Error taxonomy for configuration resolution and API requests.
//!
//! # Design
//! Two families that never mix: `ConfigError` is returned immediately to the
//! caller and never retried, `ApiClientError` is returned only after the retry
//! budget is spent. Every variant is a struct variant, so a value cannot exist
//! without the fields its message is built from. Callers branch on the variant
//! (for example 404 vs 500 via `status_code()`), never on message text.

use std::io;

use thiserror::Error;

/// Framework-wide error: one of the two families.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    ApiClient(#[from] ApiClientError),
}

/// Failures while locating, parsing or reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: file not found: {file_path}")]
    FileNotFound { file_path: String },

    #[error("configuration error: failed to parse {file_path}: {details}")]
    Parsing { file_path: String, details: String },

    #[error("configuration error: environment variable '{variable_name}' is missing or invalid")]
    EnvironmentVariable { variable_name: String },

    /// The file extension is not one of `.json`, `.yaml`, `.yml`, `.toml`.
    #[error("configuration error: unsupported format for {file_path} (expected JSON, YAML or TOML)")]
    UnsupportedFormat { file_path: String },

    #[error("configuration error: key '{key}' is expected to be of type '{expected}', but got '{actual}'")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The file exists but could not be read.
    #[error("configuration error: failed to read {file_path}: {source}")]
    Io {
        file_path: String,
        #[source]
        source: io::Error,
    },
}

/// Failures of an HTTP request after classification.
#[derive(Debug, Error)]
pub enum ApiClientError {
    /// The server answered with a non-2xx status.
    #[error("API request failed with status code {status_code}: {response_message}")]
    Request {
        status_code: u16,
        response_message: String,
    },

    #[error("API request timed out after {timeout_value} seconds")]
    Timeout { timeout_value: u64 },

    /// Any other transport failure (DNS, refused connection, bad body).
    #[error("API client error: {message}")]
    Client { message: String },
}

impl ApiClientError {
    /// The HTTP status code, present only for `Request`.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiClientError::Request { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiClientError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_error_message_carries_status_and_body() {
        let err = ApiClientError::Request {
            status_code: 404,
            response_message: "not here".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "API request failed with status code 404: not here"
        );
        assert_eq!(err.status_code(), Some(404));
        assert!(!err.is_timeout());
    }

    #[test]
    fn timeout_error_message_names_seconds() {
        let err = ApiClientError::Timeout { timeout_value: 10 };
        assert_eq!(err.to_string(), "API request timed out after 10 seconds");
        assert!(err.is_timeout());
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn type_mismatch_names_key_and_types() {
        let err = ConfigError::TypeMismatch {
            key: "PORT".to_string(),
            expected: "integer",
            actual: "string",
        };
        let msg = err.to_string();
        assert!(msg.contains("'PORT'"));
        assert!(msg.contains("'integer'"));
        assert!(msg.contains("'string'"));
    }

    #[test]
    fn framework_error_wraps_both_families() {
        let err: Error = ConfigError::FileNotFound {
            file_path: "missing.json".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Config(ConfigError::FileNotFound { .. })));
        assert_eq!(
            err.to_string(),
            "configuration error: file not found: missing.json"
        );

        let err: Error = ApiClientError::Client {
            message: "refused".to_string(),
        }
        .into();
        assert!(matches!(err, Error::ApiClient(ApiClientError::Client { .. })));
    }
}
