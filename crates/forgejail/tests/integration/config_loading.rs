use forgejail::config::{Config, ConfigError};
use forgejail::{EXAMPLE_CONFIG, Language, Platform};

use super::write_config;

#[test]
fn test_load_example_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), EXAMPLE_CONFIG);
    let config = Config::from_file(&path).expect("failed to load config");

    assert_eq!(config.default_limits.time_limit, Some(5.0));
    assert_eq!(config.default_limits.memory_limit, Some(1_024_000));
    for platform in Platform::ALL {
        for language in Language::ALL {
            assert!(config.interpreters.resolve(platform, language).is_ok());
        }
    }
}

#[test]
fn test_load_minimal_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[interpreters.linux.python]
command = ["python3", "-u"]
"#,
    );
    let config = Config::from_file(&path).expect("failed to load config");

    let python = config
        .interpreters
        .resolve(Platform::Linux, Language::Python)
        .unwrap();
    assert_eq!(python.invocation("main.py"), vec!["python3", "-u", "main.py"]);
    assert!(matches!(
        config.interpreters.resolve(Platform::Linux, Language::JavaScript),
        Err(ConfigError::InterpreterNotFound { .. })
    ));
}

#[test]
fn test_load_missing_file() {
    let result = Config::from_file("/nonexistent/forgejail.toml");
    assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
}

#[test]
fn test_load_invalid_empty_command() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[interpreters.linux.python]
command = []
"#,
    );
    assert!(matches!(
        Config::from_file(&path),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_load_invalid_unknown_platform() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[interpreters.plan9.python]
command = ["python3"]
"#,
    );
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_load_invalid_time_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[default_limits]
time_limit = 0.0
"#,
    );
    assert!(matches!(
        Config::from_file(&path),
        Err(ConfigError::Invalid(_))
    ));
}
