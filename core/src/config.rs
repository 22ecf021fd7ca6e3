//! Multi-source configuration lookup with type validation.
//!
//! # Design
//! Resolution order is fixed: environment sources, then the loaded file store,
//! then the caller's default. The type check happens at the read site, against
//! the Rust type the caller asks for, so the same file value may be read as
//! different types by different callers.
//!
//! The file store sits behind an `ArcSwap`. `load_file` parses the new file
//! completely before swapping a single pointer, so readers always see either
//! the old store or the new one, never a partial store, and never take a lock.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::env::Environment;
use crate::error::ConfigError;

/// Supported config file formats, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.to_str()?;
        if name.ends_with(".json") {
            Some(ConfigFormat::Json)
        } else if name.ends_with(".yaml") || name.ends_with(".yml") {
            Some(ConfigFormat::Yaml)
        } else if name.ends_with(".toml") {
            Some(ConfigFormat::Toml)
        } else {
            None
        }
    }

    fn parse(self, content: &str) -> Result<Value, String> {
        match self {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Yaml if content.trim().is_empty() => Ok(Value::Null),
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

/// Name of the JSON-like kind of a value, as reported in type errors.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A Rust type a configuration value can be read as.
pub trait ConfigType: Sized {
    /// Kind name used in `TypeMismatch` errors.
    const KIND: &'static str;

    /// `None` when the value is of a different kind.
    fn from_value(value: &Value) -> Option<Self>;
}

impl ConfigType for String {
    const KIND: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl ConfigType for i64 {
    const KIND: &'static str = "integer";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl ConfigType for u64 {
    const KIND: &'static str = "integer";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_u64()
    }
}

impl ConfigType for f64 {
    const KIND: &'static str = "float";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) if n.is_f64() => n.as_f64(),
            _ => None,
        }
    }
}

impl ConfigType for bool {
    const KIND: &'static str = "boolean";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl ConfigType for Vec<Value> {
    const KIND: &'static str = "array";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_array().cloned()
    }
}

impl ConfigType for Map<String, Value> {
    const KIND: &'static str = "object";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_object().cloned()
    }
}

/// Accepts any kind.
impl ConfigType for Value {
    const KIND: &'static str = "any";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

/// Key/value pairs parsed from one config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    source: Option<PathBuf>,
    values: Map<String, Value>,
}

impl ConfigStore {
    /// Parse the file at `path`. The top-level document must be a mapping;
    /// an empty YAML document yields an empty store.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file_path = path.display().to_string();
        if !path.exists() {
            return Err(ConfigError::FileNotFound { file_path });
        }
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat {
                file_path: file_path.clone(),
            })?;
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            file_path: file_path.clone(),
            source,
        })?;

        let values = match format.parse(&content) {
            Ok(Value::Object(values)) => values,
            Ok(Value::Null) => Map::new(),
            Ok(other) => {
                return Err(ConfigError::Parsing {
                    file_path,
                    details: format!("top-level value must be a mapping, got {}", kind_of(&other)),
                })
            }
            Err(details) => return Err(ConfigError::Parsing { file_path, details }),
        };

        Ok(Self {
            source: Some(path.to_path_buf()),
            values,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Path the store was parsed from, `None` for the empty initial store.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolves settings from the environment, a loaded file and defaults.
#[derive(Debug)]
pub struct ConfigResolver {
    env: Environment,
    store: ArcSwap<ConfigStore>,
}

impl ConfigResolver {
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            store: ArcSwap::from_pointee(ConfigStore::default()),
        }
    }

    /// Construct and load `path` in one step.
    pub fn from_file(env: Environment, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let resolver = Self::new(env);
        resolver.load_file(path)?;
        Ok(resolver)
    }

    /// Parse `path` and replace the current store. On failure the previous
    /// store stays in place.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let store = ConfigStore::load(path).inspect_err(|e| {
            error!(path = %path.display(), error = %e, "failed to load configuration");
        })?;
        info!(path = %path.display(), keys = store.len(), "configuration loaded");
        self.store.store(Arc::new(store));
        Ok(())
    }

    /// Re-parse the file the current store came from. No-op when nothing has
    /// been loaded yet.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let current = self.store.load_full();
        match current.source() {
            Some(path) => self.load_file(path),
            None => {
                debug!("reload requested with no configuration file loaded");
                Ok(())
            }
        }
    }

    /// Current file store snapshot.
    pub fn store(&self) -> Arc<ConfigStore> {
        self.store.load_full()
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Look up `key` and check it against `T`.
    ///
    /// Environment values are always strings, so asking for a non-string type
    /// of a key set in the environment is a `TypeMismatch`. Returns `Ok(None)`
    /// when no source has the key and no default is given.
    pub fn get<T: ConfigType>(&self, key: &str, default: Option<T>) -> Result<Option<T>, ConfigError> {
        if let Some(raw) = self.env.var(key) {
            debug!(key, source = "environment", "resolved config key");
            return validate(key, &Value::String(raw)).map(Some);
        }

        let store = self.store.load();
        if let Some(value) = store.get(key) {
            debug!(key, source = "file", "resolved config key");
            return validate(key, value).map(Some);
        }

        if default.is_some() {
            warn!(key, "config key not found, using default value");
        } else {
            warn!(key, "config key not found and no default given");
        }
        Ok(default)
    }

    /// Untyped lookup in the same order, without a default.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.env
            .var(key)
            .map(Value::String)
            .or_else(|| self.store.load().get(key).cloned())
    }

    /// Snapshot of every environment variable, re-read on each call.
    pub fn load_all_environment(&self) -> BTreeMap<String, String> {
        info!("loading all configuration values from the environment");
        self.env.vars()
    }
}

fn validate<T: ConfigType>(key: &str, value: &Value) -> Result<T, ConfigError> {
    T::from_value(value).ok_or_else(|| {
        let err = ConfigError::TypeMismatch {
            key: key.to_string(),
            expected: T::KIND,
            actual: kind_of(value),
        };
        error!(key, error = %err, "config type validation failed");
        err
    })
}
