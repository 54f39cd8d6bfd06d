//! Configuration file loading for Forgejail
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, File, FileFormat};

use crate::config::{Config, ConfigError, Language, Platform};

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::ReadFile {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }

        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (platform, language, interpreter) in self.interpreters.entries() {
            platform.parse::<Platform>()?;
            language.parse::<Language>().map_err(|_| {
                ConfigError::Invalid(format!("unknown language '{language}' for {platform}"))
            })?;
            if interpreter.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "interpreter for '{language}' on {platform} has empty command"
                )));
            }
        }

        self.default_limits.validate().map_err(ConfigError::Invalid)?;
        self.watchdog.validate().map_err(ConfigError::Invalid)?;

        if self.nsjail_path.as_os_str().is_empty() || self.time_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "nsjail_path and time_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
[interpreters.linux.python]
command = ["python3"]
"#;

        let config = Config::parse_toml(toml).unwrap();
        let interp = config
            .interpreters
            .resolve(Platform::Linux, Language::Python)
            .unwrap();
        assert_eq!(interp.command, vec!["python3"]);
        // Unset sections fall back to built-in defaults
        assert_eq!(config.sandbox.user, 99999);
        assert_eq!(config.default_limits.time_limit, Some(5.0));
        assert_eq!(config.watchdog.grace, 0.5);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
nsjail_path = "/usr/local/bin/nsjail"
time_path = "/opt/bin/time"

[sandbox]
user = 65534
group = 65534
keep_env = false
quiet = false

[[sandbox.mounts]]
source = "/usr"

[[sandbox.mounts]]
source = "/opt/node"
target = "/node"
optional = true

[default_limits]
time_limit = 2.0
memory_limit = 262144

[watchdog]
grace = 1.5
reap_timeout = 0.25

[interpreters.linux.javascript]
command = ["/opt/node/bin/node", "--stack-size=4096"]
"#;

        let config = Config::parse_toml(toml).unwrap();
        assert_eq!(
            config.nsjail_path,
            std::path::PathBuf::from("/usr/local/bin/nsjail")
        );
        assert_eq!(config.time_path, std::path::PathBuf::from("/opt/bin/time"));
        assert_eq!(config.sandbox.user, 65534);
        assert!(!config.sandbox.keep_env);
        assert!(!config.sandbox.quiet);
        assert_eq!(config.sandbox.mounts.len(), 2);
        assert_eq!(config.sandbox.mounts[1].target.as_deref(), Some("/node"));
        assert!(config.sandbox.mounts[1].optional);
        assert_eq!(config.default_limits.time_limit, Some(2.0));
        assert_eq!(config.default_limits.memory_limit, Some(262144));
        assert_eq!(config.watchdog.grace, 1.5);
        assert_eq!(config.watchdog.reap_timeout, 0.25);
        assert_eq!(
            config
                .interpreters
                .resolve(Platform::Linux, Language::JavaScript)
                .unwrap()
                .command,
            vec!["/opt/node/bin/node", "--stack-size=4096"]
        );
    }

    #[test]
    fn test_partial_limits_keep_other_defaults() {
        let toml = r#"
[default_limits]
time_limit = 1.0
"#;

        let config = Config::parse_toml(toml).unwrap();
        assert_eq!(config.default_limits.time_limit, Some(1.0));
        assert_eq!(config.default_limits.memory_limit, None);
        assert_eq!(config.effective_limits(None).memory_limit, Some(1_024_000));
    }

    #[test]
    fn test_invalid_empty_command() {
        let toml = r#"
[interpreters.linux.python]
command = []
"#;

        let result = Config::parse_toml(toml);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_unknown_platform() {
        let toml = r#"
[interpreters.plan9.python]
command = ["python3"]
"#;

        assert!(Config::parse_toml(toml).is_err());
    }

    #[test]
    fn test_invalid_unknown_language() {
        let toml = r#"
[interpreters.linux.cobol]
command = ["cobc"]
"#;

        assert!(Config::parse_toml(toml).is_err());
    }

    #[test]
    fn test_invalid_zero_time_limit() {
        let toml = r#"
[default_limits]
time_limit = 0.0
"#;

        assert!(Config::parse_toml(toml).is_err());
    }

    #[test]
    fn test_invalid_negative_grace() {
        let toml = r#"
[watchdog]
grace = -1.0
"#;

        assert!(Config::parse_toml(toml).is_err());
    }

    #[test]
    fn test_invalid_zero_grace() {
        let toml = r#"
[watchdog]
grace = 0.0
"#;

        assert!(matches!(
            Config::parse_toml(toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file("/nonexistent/forgejail.toml");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
