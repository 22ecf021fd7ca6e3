//! Environment-like key/value sources consulted before any config file.
//!
//! # Design
//! An `Environment` is built once by the entry point and handed to the
//! `ConfigResolver`. The live process environment is re-read on every lookup;
//! nothing about it is cached. A `.env` file is parsed once into an overlay
//! map and never written back into the process, so variables already set in
//! the process keep their value (the usual dotenv rule).

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, error};

use crate::error::ConfigError;

/// Ordered environment sources: the live process first, then the overlay.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    process: bool,
    overlay: BTreeMap<String, String>,
}

impl Environment {
    /// The live process environment only.
    pub fn process() -> Self {
        Self {
            process: true,
            overlay: BTreeMap::new(),
        }
    }

    /// The live process environment, with a `.env` file filling the gaps.
    ///
    /// A missing file is not an error: the result is the plain process
    /// environment. A malformed line yields `ConfigError::Parsing`.
    pub fn with_dotenv(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file_path = path.display().to_string();
        if !path.exists() {
            debug!(path = %file_path, "no .env file, using process environment only");
            return Ok(Self::process());
        }

        let parse_error = |e: dotenvy::Error| {
            error!(path = %file_path, error = %e, "failed to parse .env file");
            ConfigError::Parsing {
                file_path: file_path.clone(),
                details: e.to_string(),
            }
        };
        let mut overlay = BTreeMap::new();
        for item in dotenvy::from_path_iter(path).map_err(parse_error)? {
            let (key, value) = item.map_err(parse_error)?;
            overlay.insert(key, value);
        }
        debug!(path = %file_path, count = overlay.len(), "loaded .env overlay");

        Ok(Self {
            process: true,
            overlay,
        })
    }

    /// A fixed set of variables, detached from the process environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            process: false,
            overlay: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn var(&self, key: &str) -> Option<String> {
        if self.process {
            if let Ok(value) = std::env::var(key) {
                return Some(value);
            }
        }
        self.overlay.get(key).cloned()
    }

    /// Like `var`, but absence is an `EnvironmentVariable` error.
    pub fn require(&self, key: &str) -> Result<String, ConfigError> {
        self.var(key).ok_or_else(|| {
            error!(key, "required environment variable is not set");
            ConfigError::EnvironmentVariable {
                variable_name: key.to_string(),
            }
        })
    }

    /// Snapshot of every variable currently visible. Non-UTF-8 entries of the
    /// process environment are skipped.
    pub fn vars(&self) -> BTreeMap<String, String> {
        let mut all: BTreeMap<String, String> = BTreeMap::new();
        if self.process {
            for (key, value) in std::env::vars_os() {
                if let (Ok(key), Ok(value)) = (key.into_string(), value.into_string()) {
                    all.insert(key, value);
                }
            }
        }
        for (key, value) in &self.overlay {
            all.entry(key.clone()).or_insert_with(|| value.clone());
        }
        all
    }
}
