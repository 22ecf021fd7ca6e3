//! Resolution order against the live process environment.
//!
//! `temp_env` serializes these mutations, so the tests may run in parallel
//! with each other.

use std::io::Write;

use apiharness_core::{ConfigError, ConfigResolver, Environment};

const KEY: &str = "APIHARNESS_IT_BASE_URL";

fn json_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn file_value_used_when_env_unset() {
    let file = json_file(&format!(r#"{{"{KEY}": "http://x"}}"#));
    temp_env::with_var(KEY, None::<&str>, || {
        let config = ConfigResolver::from_file(Environment::process(), file.path()).unwrap();
        let url = config
            .get(KEY, Some("http://localhost:5000".to_string()))
            .unwrap();
        assert_eq!(url.as_deref(), Some("http://x"));
    });
}

#[test]
fn process_env_overrides_file() {
    let file = json_file(&format!(r#"{{"{KEY}": "http://x"}}"#));
    temp_env::with_var(KEY, Some("http://y"), || {
        let config = ConfigResolver::from_file(Environment::process(), file.path()).unwrap();
        let url = config
            .get(KEY, Some("http://localhost:5000".to_string()))
            .unwrap();
        assert_eq!(url.as_deref(), Some("http://y"));
    });
}

#[test]
fn env_changes_are_seen_without_reload() {
    let config = ConfigResolver::new(Environment::process());
    temp_env::with_var(KEY, Some("first"), || {
        assert_eq!(config.get::<String>(KEY, None).unwrap().as_deref(), Some("first"));
        assert_eq!(config.load_all_environment()[KEY], "first");
    });
    temp_env::with_var(KEY, Some("second"), || {
        assert_eq!(config.get::<String>(KEY, None).unwrap().as_deref(), Some("second"));
    });
    temp_env::with_var(KEY, None::<&str>, || {
        assert_eq!(config.get::<String>(KEY, None).unwrap(), None);
        assert!(!config.load_all_environment().contains_key(KEY));
    });
}

#[test]
fn dotenv_overlay_sits_between_process_and_file() {
    let mut dotenv = tempfile::NamedTempFile::new().unwrap();
    writeln!(dotenv, "{KEY}=http://from-dotenv").unwrap();
    let file = json_file(&format!(r#"{{"{KEY}": "http://from-file"}}"#));

    temp_env::with_var(KEY, None::<&str>, || {
        let env = Environment::with_dotenv(dotenv.path()).unwrap();
        let config = ConfigResolver::from_file(env, file.path()).unwrap();
        assert_eq!(
            config.get::<String>(KEY, None).unwrap().as_deref(),
            Some("http://from-dotenv")
        );
    });
}

#[test]
fn required_variable_reports_its_name() {
    temp_env::with_var(KEY, None::<&str>, || {
        let err = Environment::process().require(KEY).unwrap_err();
        assert!(matches!(err, ConfigError::EnvironmentVariable { ref variable_name } if variable_name == KEY));
        assert!(err.to_string().contains(KEY));
    });
}
