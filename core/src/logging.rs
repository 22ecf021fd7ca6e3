//! Explicit `tracing` subscriber setup.
//!
//! Nothing in the library installs a subscriber on its own. The entry point
//! (a test harness, a binary) builds a `LogConfig` and calls `init` once;
//! later calls are harmless and report that a subscriber already exists.

use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive, e.g. `info` or `apiharness_core=debug`.
    pub level: String,
    pub format: LogFormat,
    /// Route output through the test writer so `cargo test` captures it.
    pub test_writer: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            test_writer: false,
        }
    }
}

impl LogConfig {
    /// Debug level, captured by the test harness.
    pub fn for_tests() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Compact,
            test_writer: true,
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `config.level`.
///
/// Returns `false` if a subscriber was already installed.
pub fn init(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match (config.format, config.test_writer) {
        (LogFormat::Compact, false) => builder.compact().try_init(),
        (LogFormat::Compact, true) => builder.compact().with_test_writer().try_init(),
        (LogFormat::Json, false) => builder.json().try_init(),
        (LogFormat::Json, true) => builder.json().with_test_writer().try_init(),
    };
    result.is_ok()
}
