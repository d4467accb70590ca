//! Client configuration: endpoint, HTTP settings, retry policy and pacing.
//!
//! Everything is supplied programmatically (`Default` plus struct update)
//! or loaded from a JSON file. Durations are written as seconds.

use crate::error::{Result, ScholarError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default Google Scholar URL
pub const DEFAULT_SCHOLAR_URL: &str = "https://scholar.google.com";

/// User agent string for requests
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// How often and how patiently a page fetch is retried.
///
/// The delay after failed attempt `i` (1-indexed) is
/// `base_delay * multiplier^(i-1)`. Fields are fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RetryPolicyRepr", into = "RetryPolicyRepr")]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    multiplier: f64,
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` must be positive and `multiplier`
    /// a finite, non-negative number.
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Result<Self> {
        if max_attempts == 0 {
            return Err(ScholarError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(ScholarError::Config(format!(
                "backoff multiplier must be finite and non-negative, got {}",
                multiplier
            )));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            multiplier,
        })
    }

    /// A policy that tries exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Delay to wait after failed attempt `attempt` (1-indexed).
    ///
    /// Saturates at `Duration::MAX` instead of overflowing.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RetryPolicyRepr {
    max_attempts: u32,
    #[serde(with = "secs")]
    base_delay: Duration,
    multiplier: f64,
}

impl TryFrom<RetryPolicyRepr> for RetryPolicy {
    type Error = ScholarError;

    fn try_from(repr: RetryPolicyRepr) -> Result<Self> {
        Self::new(repr.max_attempts, repr.base_delay, repr.multiplier)
    }
}

impl From<RetryPolicy> for RetryPolicyRepr {
    fn from(policy: RetryPolicy) -> Self {
        Self {
            max_attempts: policy.max_attempts,
            base_delay: policy.base_delay,
            multiplier: policy.multiplier,
        }
    }
}

/// Random courtesy delay taken before follow-up requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PacingRepr", into = "PacingRepr")]
pub struct Pacing {
    min: Duration,
    max: Duration,
}

impl Pacing {
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(ScholarError::Config(format!(
                "pacing minimum {:?} exceeds maximum {:?}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw a delay uniformly from `min..=max` at millisecond resolution.
    pub fn sample(&self) -> Duration {
        use rand::Rng;

        let lo = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let hi = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(2),
            max: Duration::from_secs(5),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PacingRepr {
    #[serde(with = "secs")]
    min: Duration,
    #[serde(with = "secs")]
    max: Duration,
}

impl TryFrom<PacingRepr> for Pacing {
    type Error = ScholarError;

    fn try_from(repr: PacingRepr) -> Result<Self> {
        Self::new(repr.min, repr.max)
    }
}

impl From<Pacing> for PacingRepr {
    fn from(pacing: Pacing) -> Self {
        Self {
            min: pacing.min,
            max: pacing.max,
        }
    }
}

/// Configuration for a [`ScholarClient`](crate::scholar::ScholarClient)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScholarConfig {
    /// Scholar endpoint, or a mirror site
    pub base_url: String,
    /// Interface language sent as `hl`; parsing assumes English labels
    pub language: String,
    /// Per-request timeout; `None` waits indefinitely
    #[serde(with = "opt_secs")]
    pub timeout: Option<Duration>,
    pub user_agent: String,
    /// Proxy URL (e.g., "http://127.0.0.1:7890")
    pub proxy: Option<String>,
    pub retry: RetryPolicy,
    /// Delay between follow-up citation lookups; `None` disables it
    pub pacing: Option<Pacing>,
    /// Persisted session cookies to send with every request
    pub cookie_file: Option<PathBuf>,
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SCHOLAR_URL.to_string(),
            language: "en".to_string(),
            timeout: None,
            user_agent: USER_AGENT.to_string(),
            proxy: None,
            retry: RetryPolicy::default(),
            pacing: Some(Pacing::default()),
            cookie_file: None,
        }
    }
}

impl ScholarConfig {
    /// Parse a configuration from JSON; absent keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        debug!(path = ?path, "Loaded configuration");
        Ok(config)
    }

    /// Base URL without trailing slashes.
    pub(crate) fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

mod opt_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()
    }
}
