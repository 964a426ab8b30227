//! Configuration module for tailhook.
//!
//! Settings come from command line flags, falling back to environment
//! variables, falling back to defaults.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `TAILHOOK_FILE` | Yes | - | File to monitor |
//! | `TAILHOOK_WEBHOOK_URL` | Yes | - | Webhook endpoint (`http` or `https`) |
//! | `TAILHOOK_COLOR` | No | `info` | Attachment color / severity tag |
//! | `TAILHOOK_NOTIFY_EXISTING_TAIL` | No | `false` | Notify for the existing last line on startup |
//! | `TAILHOOK_WORKERS` | No | 4 | Concurrent deliveries |
//! | `TAILHOOK_QUEUE_SIZE` | No | 100 | Notifications waiting for a worker |
//! | `TAILHOOK_REQUEST_TIMEOUT_SECS` | No | 30 | Per-request timeout |
//! | `TAILHOOK_LOG_FORMAT` | No | `text` | `text` or `json` |
//!
//! # Example
//!
//! ```no_run
//! use tailhook_monitor::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Watching: {}", config.file.display());
//! ```

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::dispatcher::{DispatcherConfig, DEFAULT_QUEUE_SIZE, DEFAULT_WORKERS};
use crate::sender::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::tracker::StartupPolicy;
use crate::types::DEFAULT_COLOR;

pub const ENV_FILE: &str = "TAILHOOK_FILE";
pub const ENV_WEBHOOK_URL: &str = "TAILHOOK_WEBHOOK_URL";
pub const ENV_COLOR: &str = "TAILHOOK_COLOR";
pub const ENV_NOTIFY_EXISTING_TAIL: &str = "TAILHOOK_NOTIFY_EXISTING_TAIL";
pub const ENV_WORKERS: &str = "TAILHOOK_WORKERS";
pub const ENV_QUEUE_SIZE: &str = "TAILHOOK_QUEUE_SIZE";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "TAILHOOK_REQUEST_TIMEOUT_SECS";
pub const ENV_LOG_FORMAT: &str = "TAILHOOK_LOG_FORMAT";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting was given neither as a flag nor in the environment.
    #[error("missing required setting: {flag} or {env}")]
    MissingValue {
        flag: &'static str,
        env: &'static str,
    },

    /// A setting has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,

    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'text' or 'json', got '{other}'")),
        }
    }
}

/// Values given on the command line. `None` falls back to the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub file: Option<PathBuf>,
    pub webhook_url: Option<String>,
    pub color: Option<String>,
    pub notify_existing_tail: bool,
    pub workers: Option<usize>,
    pub queue_size: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub log_format: Option<String>,
}

/// Configuration for tailhook.
#[derive(Debug, Clone)]
pub struct Config {
    /// File to monitor.
    pub file: PathBuf,

    /// Webhook endpoint.
    pub webhook_url: String,

    /// Attachment color sent with every notification.
    pub color: String,

    /// Whether the existing last line is notified on startup.
    pub startup_policy: StartupPolicy,

    /// Dispatch worker pool sizing.
    pub dispatcher: DispatcherConfig,

    /// Per-request HTTP timeout.
    pub request_timeout: Duration,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Config {
    /// Creates a new `Config` from environment variables only.
    ///
    /// # Errors
    ///
    /// See [`Config::resolve`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(ConfigOverrides::default())
    }

    /// Creates a new `Config` from command line values, falling back to
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - The file or webhook URL is missing
    /// - The webhook URL is not an absolute `http`/`https` URL
    /// - A numeric setting is not a positive integer
    /// - A boolean or log format setting cannot be parsed
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let file = overrides
            .file
            .or_else(|| env::var(ENV_FILE).ok().map(PathBuf::from))
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::MissingValue {
                flag: "--file",
                env: ENV_FILE,
            })?;

        let webhook_url = overrides
            .webhook_url
            .or_else(|| env::var(ENV_WEBHOOK_URL).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingValue {
                flag: "--webhook",
                env: ENV_WEBHOOK_URL,
            })?;
        validate_webhook_url(&webhook_url)?;

        let color = overrides
            .color
            .or_else(|| env::var(ENV_COLOR).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_COLOR.to_string());

        let notify_existing_tail = overrides.notify_existing_tail
            || match env::var(ENV_NOTIFY_EXISTING_TAIL) {
                Ok(val) => parse_bool(ENV_NOTIFY_EXISTING_TAIL, &val)?,
                Err(_) => false,
            };
        let startup_policy = if notify_existing_tail {
            StartupPolicy::NotifyExistingTail
        } else {
            StartupPolicy::SkipExistingTail
        };

        let workers = positive_setting(overrides.workers, ENV_WORKERS, DEFAULT_WORKERS)?;
        let queue_size =
            positive_setting(overrides.queue_size, ENV_QUEUE_SIZE, DEFAULT_QUEUE_SIZE)?;
        let request_timeout_secs = positive_setting(
            overrides.request_timeout_secs,
            ENV_REQUEST_TIMEOUT_SECS,
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        let log_format = match overrides.log_format.or_else(|| env::var(ENV_LOG_FORMAT).ok()) {
            Some(val) => val
                .parse::<LogFormat>()
                .map_err(|message| ConfigError::InvalidValue {
                    key: ENV_LOG_FORMAT.to_string(),
                    message,
                })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            file,
            webhook_url,
            color,
            startup_policy,
            dispatcher: DispatcherConfig {
                workers,
                queue_size,
            },
            request_timeout: Duration::from_secs(request_timeout_secs),
            log_format,
        })
    }
}

/// Checks that `url` is an absolute `http` or `https` URL.
fn validate_webhook_url(url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidValue {
        key: ENV_WEBHOOK_URL.to_string(),
        message: format!("{e}: '{url}'"),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::InvalidValue {
            key: ENV_WEBHOOK_URL.to_string(),
            message: format!("expected http or https URL, got scheme '{scheme}'"),
        }),
    }
}

/// Resolves a positive integer from a flag, then `key` in the environment.
fn positive_setting<T>(flag: Option<T>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default + std::fmt::Display,
{
    let value = match flag {
        Some(value) => value,
        None => match env::var(key) {
            Ok(val) => val
                .trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("expected positive integer, got '{val}'"),
                })?,
            Err(_) => default,
        },
    };

    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "value must be greater than 0".to_string(),
        });
    }

    Ok(value)
}

/// Parses common boolean spellings.
fn parse_bool(key: &str, val: &str) -> Result<bool, ConfigError> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean, got '{val}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to run tests with isolated environment variables.
    /// Clears all TAILHOOK_* vars before the test and restores them after.
    fn with_clean_env<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let saved_vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with("TAILHOOK_"))
            .collect();

        for (key, _) in &saved_vars {
            env::remove_var(key);
        }

        let result = f();

        for (key, _) in env::vars().filter(|(k, _)| k.starts_with("TAILHOOK_")) {
            env::remove_var(key);
        }
        for (key, value) in saved_vars {
            env::set_var(key, value);
        }

        result
    }

    fn set_required() {
        env::set_var(ENV_FILE, "/var/log/app.log");
        env::set_var(ENV_WEBHOOK_URL, "https://hooks.example.com/in/abc");
    }

    #[test]
    #[serial]
    fn test_missing_file() {
        with_clean_env(|| {
            env::set_var(ENV_WEBHOOK_URL, "https://hooks.example.com/in/abc");

            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingValue { env, .. } if env == ENV_FILE));
        });
    }

    #[test]
    #[serial]
    fn test_missing_webhook() {
        with_clean_env(|| {
            env::set_var(ENV_FILE, "/var/log/app.log");

            let err = Config::from_env().unwrap_err();
            assert_eq!(
                err.to_string(),
                "missing required setting: --webhook or TAILHOOK_WEBHOOK_URL"
            );
        });
    }

    #[test]
    #[serial]
    fn test_minimal_config() {
        with_clean_env(|| {
            set_required();

            let config = Config::from_env().expect("should parse minimal config");

            assert_eq!(config.file, PathBuf::from("/var/log/app.log"));
            assert_eq!(config.webhook_url, "https://hooks.example.com/in/abc");
            assert_eq!(config.color, DEFAULT_COLOR);
            assert_eq!(config.startup_policy, StartupPolicy::SkipExistingTail);
            assert_eq!(config.dispatcher, DispatcherConfig::default());
            assert_eq!(
                config.request_timeout,
                Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
            );
            assert_eq!(config.log_format, LogFormat::Text);
        });
    }

    #[test]
    #[serial]
    fn test_full_env_config() {
        with_clean_env(|| {
            set_required();
            env::set_var(ENV_COLOR, "error");
            env::set_var(ENV_NOTIFY_EXISTING_TAIL, "yes");
            env::set_var(ENV_WORKERS, "8");
            env::set_var(ENV_QUEUE_SIZE, "500");
            env::set_var(ENV_REQUEST_TIMEOUT_SECS, "5");
            env::set_var(ENV_LOG_FORMAT, "JSON");

            let config = Config::from_env().expect("should parse full config");

            assert_eq!(config.color, "error");
            assert_eq!(config.startup_policy, StartupPolicy::NotifyExistingTail);
            assert_eq!(config.dispatcher.workers, 8);
            assert_eq!(config.dispatcher.queue_size, 500);
            assert_eq!(config.request_timeout, Duration::from_secs(5));
            assert_eq!(config.log_format, LogFormat::Json);
        });
    }

    #[test]
    #[serial]
    fn test_flags_override_env() {
        with_clean_env(|| {
            set_required();
            env::set_var(ENV_COLOR, "error");
            env::set_var(ENV_WORKERS, "8");

            let config = Config::resolve(ConfigOverrides {
                file: Some(PathBuf::from("/tmp/other.log")),
                webhook_url: Some("http://localhost:8080/hook".to_string()),
                color: Some("warning".to_string()),
                notify_existing_tail: true,
                workers: Some(2),
                ..ConfigOverrides::default()
            })
            .expect("should parse overrides");

            assert_eq!(config.file, PathBuf::from("/tmp/other.log"));
            assert_eq!(config.webhook_url, "http://localhost:8080/hook");
            assert_eq!(config.color, "warning");
            assert_eq!(config.startup_policy, StartupPolicy::NotifyExistingTail);
            assert_eq!(config.dispatcher.workers, 2);
        });
    }

    #[test]
    #[serial]
    fn test_invalid_webhook_scheme() {
        with_clean_env(|| {
            set_required();
            env::set_var(ENV_WEBHOOK_URL, "ftp://example.com/hook");

            let err = Config::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, ref message }
                    if key == ENV_WEBHOOK_URL && message.contains("'ftp'")
            ));
        });
    }

    #[test]
    #[serial]
    fn test_relative_webhook_rejected() {
        with_clean_env(|| {
            set_required();
            env::set_var(ENV_WEBHOOK_URL, "hooks/in/abc");

            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == ENV_WEBHOOK_URL));
        });
    }

    #[test]
    #[serial]
    fn test_invalid_workers() {
        with_clean_env(|| {
            set_required();
            env::set_var(ENV_WORKERS, "many");

            let err = Config::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, .. } if key == ENV_WORKERS
            ));
        });
    }

    #[test]
    #[serial]
    fn test_zero_queue_size_rejected() {
        with_clean_env(|| {
            set_required();
            env::set_var(ENV_QUEUE_SIZE, "0");

            let err = Config::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, ref message }
                    if key == ENV_QUEUE_SIZE && message.contains("greater than 0")
            ));
        });
    }

    #[test]
    #[serial]
    fn test_zero_workers_flag_rejected() {
        with_clean_env(|| {
            set_required();

            let err = Config::resolve(ConfigOverrides {
                workers: Some(0),
                ..ConfigOverrides::default()
            })
            .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == ENV_WORKERS));
        });
    }

    #[test]
    #[serial]
    fn test_invalid_bool() {
        with_clean_env(|| {
            set_required();
            env::set_var(ENV_NOTIFY_EXISTING_TAIL, "maybe");

            let err = Config::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, .. } if key == ENV_NOTIFY_EXISTING_TAIL
            ));
        });
    }

    #[test]
    #[serial]
    fn test_blank_color_uses_default() {
        with_clean_env(|| {
            set_required();
            env::set_var(ENV_COLOR, "  ");

            let config = Config::from_env().unwrap();
            assert_eq!(config.color, DEFAULT_COLOR);
        });
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert_eq!(" Json ".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("K", "TRUE").unwrap());
        assert!(parse_bool("K", "1").unwrap());
        assert!(!parse_bool("K", "off").unwrap());
        assert!(parse_bool("K", "2").is_err());
    }
}
