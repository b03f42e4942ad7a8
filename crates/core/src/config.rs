//! Client runtime configuration.
//!
//! Configuration is resolved once at start-up and then passed into the transport and page
//! controllers. Nothing in this crate reads process environment variables while handling a
//! user action; binaries read the environment and hand the raw values to
//! [`ClientConfig::from_env_values`].

use crate::constants::{
    DEFAULT_API_BASE, DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RETRY_BACKOFF_MS,
};
use crate::error::{ConfigError, ConfigResult};
use crate::role_gate::{load_role_rules, RoleRule};
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

/// How reads react to transient failures.
///
/// Writes are never retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// # Errors
    ///
    /// `ConfigError::InvalidValue` when `max_attempts` is zero.
    pub fn new(max_attempts: u32, backoff: Duration) -> ConfigResult<Self> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_attempts",
                value: "0".into(),
            });
        }
        Ok(Self {
            max_attempts,
            backoff,
        })
    }

    /// A single attempt.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

/// Client configuration resolved at start-up.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    base_url: Url,
    request_timeout: Duration,
    retry: RetryPolicy,
    role_rules: Vec<RoleRule>,
}

impl ClientConfig {
    /// Create a new `ClientConfig`.
    ///
    /// The base URL is normalised to end with `/` so relative endpoint paths join beneath it.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidBaseUrl` if `base_url` does not parse or is not http(s)
    /// - `ConfigError::InvalidValue` if `request_timeout` is zero
    pub fn new(base_url: &str, request_timeout: Duration, retry: RetryPolicy) -> ConfigResult<Self> {
        let trimmed = base_url.trim();
        let normalised = if trimmed.ends_with('/') {
            trimmed.to_owned()
        } else {
            format!("{trimmed}/")
        };

        let parsed = Url::parse(&normalised).map_err(|e| ConfigError::InvalidBaseUrl {
            url: trimmed.to_owned(),
            problem: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: trimmed.to_owned(),
                problem: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        if request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "request_timeout",
                value: "0".into(),
            });
        }

        Ok(Self {
            base_url: parsed,
            request_timeout,
            retry,
            role_rules: Vec::new(),
        })
    }

    /// Builds a configuration from raw environment values, applying defaults for absent ones.
    ///
    /// Blank values count as absent.
    ///
    /// # Errors
    ///
    /// Any value that does not parse, plus the errors of [`ClientConfig::new`] and
    /// [`load_role_rules`].
    pub fn from_env_values(values: EnvValues) -> ConfigResult<Self> {
        let base = non_blank(values.api_base).unwrap_or_else(|| DEFAULT_API_BASE.to_owned());
        let timeout_secs = parse_u64("CLINIC_REQUEST_TIMEOUT_SECS", values.request_timeout_secs)?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let max_attempts = parse_u64("CLINIC_MAX_ATTEMPTS", values.max_attempts)?
            .map(|n| {
                u32::try_from(n).map_err(|_| ConfigError::InvalidValue {
                    name: "CLINIC_MAX_ATTEMPTS",
                    value: n.to_string(),
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);
        let backoff_ms = parse_u64("CLINIC_RETRY_BACKOFF_MS", values.retry_backoff_ms)?
            .unwrap_or(DEFAULT_RETRY_BACKOFF_MS);

        let retry = RetryPolicy::new(max_attempts, Duration::from_millis(backoff_ms))?;
        let mut cfg = Self::new(&base, Duration::from_secs(timeout_secs), retry)?;

        if let Some(path) = values.role_rules_path {
            cfg.role_rules = load_role_rules(&path)?;
        }

        Ok(cfg)
    }

    pub fn with_role_rules(mut self, rules: Vec<RoleRule>) -> Self {
        self.role_rules = rules;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub fn role_rules(&self) -> &[RoleRule] {
        &self.role_rules
    }
}

/// Raw values as read from the environment by a binary.
#[derive(Clone, Debug, Default)]
pub struct EnvValues {
    pub api_base: Option<String>,
    pub request_timeout_secs: Option<String>,
    pub max_attempts: Option<String>,
    pub retry_backoff_ms: Option<String>,
    pub role_rules_path: Option<PathBuf>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_u64(name: &'static str, value: Option<String>) -> ConfigResult<Option<u64>> {
    non_blank(value)
        .map(|v| {
            v.parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue { name, value: v })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn base_url_gets_trailing_slash() {
        let cfg = ClientConfig::new(
            "http://127.0.0.1:8000/api/v2",
            Duration::from_secs(5),
            RetryPolicy::default(),
        )
        .expect("ClientConfig::new should succeed");
        assert_eq!(cfg.base_url().as_str(), "http://127.0.0.1:8000/api/v2/");
        assert_eq!(
            cfg.base_url().join("sedes/").unwrap().as_str(),
            "http://127.0.0.1:8000/api/v2/sedes/"
        );
    }

    #[test]
    fn rejects_non_http_base() {
        let err = ClientConfig::new("ftp://clinic", Duration::from_secs(5), RetryPolicy::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn rejects_zero_timeout_and_attempts() {
        assert!(matches!(
            ClientConfig::new("http://clinic", Duration::ZERO, RetryPolicy::default()),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(RetryPolicy::new(0, Duration::ZERO).is_err());
    }

    #[test]
    fn env_values_default_to_single_attempt() {
        let cfg = ClientConfig::from_env_values(EnvValues::default())
            .expect("defaults should be valid");
        assert_eq!(cfg.retry().max_attempts(), 1);
        assert_eq!(
            cfg.request_timeout(),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
        assert_eq!(cfg.base_url().as_str(), "http://127.0.0.1:8000/api/v2/");
        assert!(cfg.role_rules().is_empty());
    }

    #[test]
    fn env_values_are_parsed() {
        let cfg = ClientConfig::from_env_values(EnvValues {
            api_base: Some("https://clinic.example/api/v2/".into()),
            request_timeout_secs: Some("12".into()),
            max_attempts: Some("3".into()),
            retry_backoff_ms: Some(" ".into()),
            role_rules_path: None,
        })
        .expect("values should be valid");
        assert_eq!(cfg.request_timeout(), Duration::from_secs(12));
        assert_eq!(cfg.retry().max_attempts(), 3);
        assert_eq!(
            cfg.retry().backoff(),
            Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS)
        );
    }

    #[test]
    fn env_values_reject_garbage() {
        let err = ClientConfig::from_env_values(EnvValues {
            max_attempts: Some("many".into()),
            ..EnvValues::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "CLINIC_MAX_ATTEMPTS",
                ..
            }
        ));
    }

    #[test]
    fn env_values_load_role_rules_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "- element: menu.audit\n  roles: Administrador,Auditor\n- element: menu.pharmacy\n  roles: [Farmaceutico]"
        )
        .unwrap();

        let cfg = ClientConfig::from_env_values(EnvValues {
            role_rules_path: Some(file.path().to_path_buf()),
            ..EnvValues::default()
        })
        .expect("rules file should load");
        assert_eq!(cfg.role_rules().len(), 2);
    }
}
