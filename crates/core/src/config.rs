//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Nothing in the core reads environment variables while handling a
//! request; binaries read them and feed the raw values through the parsers below.

use crate::constants::{
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_DELIVERY_LATENCY, DEFAULT_FAILURE_RATE,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_NOTIFY_WORKERS, DEFAULT_RETRY_BACKOFF,
};
use crate::{PatientError, PatientResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_file: Option<PathBuf>,
    notifications: NotificationConfig,
}

impl CoreConfig {
    /// `data_file` of `None` selects the volatile in-memory store.
    pub fn new(data_file: Option<PathBuf>, notifications: NotificationConfig) -> Self {
        Self {
            data_file,
            notifications,
        }
    }

    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }

    pub fn notifications(&self) -> &NotificationConfig {
        &self.notifications
    }
}

/// Settings for the notification dispatcher and its simulated delivery channel.
#[derive(Clone, Debug, PartialEq)]
pub struct NotificationConfig {
    workers: usize,
    failure_rate: f64,
    latency: Duration,
    retry: RetryPolicy,
    attempt_timeout: Option<Duration>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_NOTIFY_WORKERS,
            failure_rate: DEFAULT_FAILURE_RATE,
            latency: DEFAULT_DELIVERY_LATENCY,
            retry: RetryPolicy::default(),
            attempt_timeout: Some(DEFAULT_ATTEMPT_TIMEOUT),
        }
    }
}

impl NotificationConfig {
    /// Create a new `NotificationConfig`.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` if `workers` is zero or `failure_rate` is not a
    /// probability.
    pub fn new(
        workers: usize,
        failure_rate: f64,
        latency: Duration,
        retry: RetryPolicy,
        attempt_timeout: Option<Duration>,
    ) -> PatientResult<Self> {
        if workers == 0 {
            return Err(PatientError::InvalidInput(
                "notification workers must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&failure_rate) {
            return Err(PatientError::InvalidInput(format!(
                "notification failure rate must be between 0 and 1, got {failure_rate}"
            )));
        }

        Ok(Self {
            workers,
            failure_rate,
            latency,
            retry,
            attempt_timeout,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }
}

/// How many times a job is attempted and how long to wait in between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` if `max_attempts` is zero.
    pub fn new(max_attempts: u32, backoff: Duration) -> PatientResult<Self> {
        if max_attempts == 0 {
            return Err(PatientError::InvalidInput(
                "max_attempts must be at least 1".into(),
            ));
        }
        Ok(Self {
            max_attempts,
            backoff,
        })
    }

    /// A single attempt: a failed delivery is final.
    pub fn no_retry() -> Self {
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

/// Parse an optional value into `T`, falling back to `default` when unset or blank.
///
/// `name` is only used in the error message.
pub fn parse_env_value<T: FromStr>(
    name: &str,
    value: Option<String>,
    default: T,
) -> PatientResult<T> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(default),
        Some(v) => v
            .parse::<T>()
            .map_err(|_| PatientError::InvalidInput(format!("{name}: cannot parse '{v}'"))),
    }
}

/// Parse an optional millisecond count, falling back to `default` when unset or blank.
pub fn duration_ms_from_env_value(
    name: &str,
    value: Option<String>,
    default: Duration,
) -> PatientResult<Duration> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_env_value(name, value, default_ms).map(Duration::from_millis)
}

/// Parse the per-attempt timeout. `0` disables the bound.
pub fn attempt_timeout_from_env_value(value: Option<String>) -> PatientResult<Option<Duration>> {
    let timeout =
        duration_ms_from_env_value("NOTIFY_ATTEMPT_TIMEOUT_MS", value, DEFAULT_ATTEMPT_TIMEOUT)?;
    Ok(Some(timeout).filter(|t| !t.is_zero()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_value_defaults_on_blank() {
        assert_eq!(parse_env_value("X", None, 7usize).unwrap(), 7);
        assert_eq!(parse_env_value("X", Some("  ".into()), 7usize).unwrap(), 7);
        assert_eq!(parse_env_value("X", Some(" 3 ".into()), 7usize).unwrap(), 3);
    }

    #[test]
    fn test_parse_env_value_reports_name() {
        let err = parse_env_value("NOTIFY_WORKERS", Some("many".into()), 1usize)
            .expect_err("non-numeric value should fail");
        assert!(err.to_string().contains("NOTIFY_WORKERS"));
    }

    #[test]
    fn test_attempt_timeout_zero_disables() {
        assert_eq!(attempt_timeout_from_env_value(Some("0".into())).unwrap(), None);
        assert_eq!(
            attempt_timeout_from_env_value(None).unwrap(),
            Some(DEFAULT_ATTEMPT_TIMEOUT)
        );
        assert_eq!(
            attempt_timeout_from_env_value(Some("250".into())).unwrap(),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_notification_config_rejects_bad_values() {
        let retry = RetryPolicy::default();
        assert!(NotificationConfig::new(0, 0.1, Duration::ZERO, retry.clone(), None).is_err());
        assert!(NotificationConfig::new(1, 1.5, Duration::ZERO, retry.clone(), None).is_err());
        assert!(NotificationConfig::new(1, -0.1, Duration::ZERO, retry.clone(), None).is_err());
        assert!(NotificationConfig::new(1, f64::NAN, Duration::ZERO, retry, None).is_err());
        assert!(RetryPolicy::new(0, Duration::ZERO).is_err());
    }

    #[test]
    fn test_defaults_match_documented_behaviour() {
        let cfg = NotificationConfig::default();
        assert_eq!(cfg.failure_rate(), 0.25);
        assert_eq!(cfg.retry().max_attempts(), 1);
        assert_eq!(cfg.latency(), Duration::from_secs(3));
    }
}
