//! Environment driven configuration for the monitor and the selector.
//!
//! Every key is optional. Values that are present but unusable are reported
//! as [`ConfigError`] instead of being coerced to a default.

use crate::error::ConfigError;
use chrono::TimeDelta;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_STORE_HOST: &str = "elasticsearch";
pub const DEFAULT_STORE_PORT: u16 = 9200;
pub const DEFAULT_STORE_USER: &str = "elastic";
pub const DEFAULT_STORE_PASSWORD: &str = "changeme";
pub const DEFAULT_INDEX_PATTERN: &str = "logstash-*";
pub const DEFAULT_CI_URL: &str = "http://jenkins:8080";
pub const DEFAULT_CI_JOB: &str = "MLOps-Pipeline";
pub const DEFAULT_CI_USER: &str = "admin";
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_LOOKBACK_MINUTES: i64 = 15;
pub const DEFAULT_SKEW_THRESHOLD: f64 = 0.7;
pub const DEFAULT_MIN_SAMPLES: usize = 50;
pub const DEFAULT_COOLDOWN_MINUTES: i64 = 30;
pub const DEFAULT_MAX_RESULTS: usize = 10_000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MODEL_BUCKETS: usize = 50;
/// Upper bound for minute-valued settings: one year.
pub const MAX_MINUTES: i64 = 365 * 24 * 60;

/// Connection settings for the event / metrics index.
#[derive(Clone, PartialEq)]
pub struct StoreConfig {
    pub base_url: Url,
    pub index: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub max_results: usize,
    pub timeout: Duration,
}

impl StoreConfig {
    /// Defaults for a store reachable at `base_url` without authentication.
    pub fn for_url(base_url: Url) -> Self {
        Self {
            base_url,
            index: DEFAULT_INDEX_PATTERN.to_string(),
            user: None,
            password: None,
            max_results: DEFAULT_MAX_RESULTS,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("base_url", &self.base_url.as_str())
            .field("index", &self.index)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("max_results", &self.max_results)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Where and how to request a retraining build.
#[derive(Clone, PartialEq)]
pub struct CiConfig {
    pub base_url: Url,
    pub job: String,
    pub user: String,
    /// `None` when the token is missing or still a placeholder.
    pub token: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for CiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("job", &self.job)
            .field("user", &self.user)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Drift detection and scheduling parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct DriftConfig {
    pub check_interval: Duration,
    pub lookback: TimeDelta,
    /// Dominant class proportion at or above which drift is declared, in (0, 1].
    pub skew_threshold: f64,
    pub min_samples: usize,
    pub cooldown: TimeDelta,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            lookback: TimeDelta::minutes(DEFAULT_LOOKBACK_MINUTES),
            skew_threshold: DEFAULT_SKEW_THRESHOLD,
            min_samples: DEFAULT_MIN_SAMPLES,
            cooldown: TimeDelta::minutes(DEFAULT_COOLDOWN_MINUTES),
        }
    }
}

/// Everything the long-running monitor needs.
#[derive(Clone, Debug, PartialEq)]
pub struct MonitorConfig {
    pub store: StoreConfig,
    pub ci: CiConfig,
    pub drift: DriftConfig,
}

impl MonitorConfig {
    /// Read the process environment. Call `dotenv()` first to honour `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = positive(&lookup, "HTTP_TIMEOUT_SECONDS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        let timeout = Duration::from_secs(timeout_secs);

        let store_url = match non_empty(&lookup, "ELASTICSEARCH_URL") {
            Some(raw) => parse_url("ELASTICSEARCH_URL", &raw)?,
            None => {
                let host = non_empty(&lookup, "ELASTICSEARCH_HOST")
                    .unwrap_or_else(|| DEFAULT_STORE_HOST.to_string());
                let port: u16 = parsed(&lookup, "ELASTICSEARCH_PORT", DEFAULT_STORE_PORT)?;
                parse_url("ELASTICSEARCH_HOST", &format!("http://{host}:{port}"))?
            }
        };
        let user = lookup("ELASTICSEARCH_USER")
            .unwrap_or_else(|| DEFAULT_STORE_USER.to_string())
            .trim()
            .to_string();
        let store = StoreConfig {
            base_url: store_url,
            index: non_empty(&lookup, "ELASTICSEARCH_INDEX")
                .unwrap_or_else(|| DEFAULT_INDEX_PATTERN.to_string()),
            password: if user.is_empty() {
                None
            } else {
                Some(
                    lookup("ELASTICSEARCH_PASSWORD")
                        .unwrap_or_else(|| DEFAULT_STORE_PASSWORD.to_string()),
                )
            },
            user: Some(user).filter(|u| !u.is_empty()),
            max_results: positive(&lookup, "QUERY_MAX_RESULTS", DEFAULT_MAX_RESULTS)?,
            timeout,
        };

        let ci_raw =
            non_empty(&lookup, "JENKINS_URL").unwrap_or_else(|| DEFAULT_CI_URL.to_string());
        let ci = CiConfig {
            base_url: parse_url("JENKINS_URL", &ci_raw)?,
            job: non_empty(&lookup, "JENKINS_JOB").unwrap_or_else(|| DEFAULT_CI_JOB.to_string()),
            user: non_empty(&lookup, "JENKINS_USER").unwrap_or_else(|| DEFAULT_CI_USER.to_string()),
            token: lookup("JENKINS_TOKEN")
                .filter(|t| valid_token(t))
                .map(|t| t.trim().to_string()),
            timeout,
        };

        let skew_threshold: f64 = parsed(&lookup, "SKEWNESS_THRESHOLD", DEFAULT_SKEW_THRESHOLD)?;
        if !(skew_threshold > 0.0 && skew_threshold <= 1.0) {
            return Err(ConfigError::invalid(
                "SKEWNESS_THRESHOLD",
                skew_threshold.to_string(),
                "must be in (0, 1]",
            ));
        }

        let drift = DriftConfig {
            check_interval: Duration::from_secs(positive(
                &lookup,
                "CHECK_INTERVAL_SECONDS",
                DEFAULT_CHECK_INTERVAL_SECS,
            )?),
            lookback: minutes(&lookup, "LOOKBACK_MINUTES", DEFAULT_LOOKBACK_MINUTES, 1)?,
            skew_threshold,
            min_samples: parsed(&lookup, "MIN_SAMPLES", DEFAULT_MIN_SAMPLES)?,
            cooldown: minutes(&lookup, "COOLDOWN_MINUTES", DEFAULT_COOLDOWN_MINUTES, 0)?,
        };

        Ok(Self { store, ci, drift })
    }
}

/// A token is usable when it is non-blank and not a documentation placeholder.
pub fn valid_token(token: &str) -> bool {
    let trimmed = token.trim();
    !trimmed.is_empty() && !trimmed.contains("...")
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(key, raw.clone(), e.to_string())),
        None => Ok(default),
    }
}

fn positive<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Default + fmt::Display,
    T::Err: fmt::Display,
{
    let value = parsed(lookup, key, default)?;
    if value <= T::default() {
        return Err(ConfigError::invalid(key, value.to_string(), "must be greater than zero"));
    }
    Ok(value)
}

fn minutes<F>(
    lookup: &F,
    key: &'static str,
    default: i64,
    min: i64,
) -> Result<TimeDelta, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value: i64 = parsed(lookup, key, default)?;
    if !(min..=MAX_MINUTES).contains(&value) {
        return Err(ConfigError::invalid(
            key,
            value.to_string(),
            format!("must be between {min} and {MAX_MINUTES}"),
        ));
    }
    TimeDelta::try_minutes(value)
        .ok_or_else(|| ConfigError::invalid(key, value.to_string(), "out of range"))
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::invalid(key, raw, e.to_string()))
}
