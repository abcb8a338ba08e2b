//! Stampede guard configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use cs_03_stampede_guard::domain::GuardConfigBuilder;
//!
//! let config = GuardConfigBuilder::new()
//!     .presence_ttl(Duration::from_secs(5))
//!     .absence_ttl(Duration::from_secs(20))
//!     .lock_lease(Duration::from_secs(10))
//!     .build()
//!     .expect("Valid config");
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::GuardError;

/// What `resolve` does when another caller holds the recompute lock
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentionPolicy {
    /// Report `LockContended` immediately.
    #[default]
    FailFast,
    /// Poll for the lock with backoff, re-reading the cache between attempts.
    Wait {
        #[serde(with = "duration_ms")]
        max_wait: Duration,
    },
}

/// Stampede guard configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Lifetime of a cached real value
    #[serde(with = "duration_ms")]
    pub presence_ttl: Duration,
    /// Lifetime of a cached absence marker
    #[serde(with = "duration_ms")]
    pub absence_ttl: Duration,
    /// Lease on the per-key recompute lock
    #[serde(with = "duration_ms")]
    pub lock_lease: Duration,
    /// Upper bound on one authoritative lookup; `None` waits indefinitely
    #[serde(with = "option_duration_ms")]
    pub load_timeout: Option<Duration>,
    pub contention: ContentionPolicy,
    /// Renew the lock lease in the background while loading
    pub renew_lease: bool,
    pub lock_prefix: String,
    pub cache_prefix: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            presence_ttl: Duration::from_secs(5),
            absence_ttl: Duration::from_secs(20),
            lock_lease: Duration::from_secs(10),
            load_timeout: None,
            contention: ContentionPolicy::FailFast,
            renew_lease: false,
            lock_prefix: "lock:".to_string(),
            cache_prefix: "cache:".to_string(),
        }
    }
}

impl GuardConfig {
    /// Defaults overridden by `CS_*` environment variables.
    pub fn from_env() -> Result<Self, GuardError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `CS_*` name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GuardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_millis(&lookup, "CS_PRESENCE_TTL_MS")? {
            config.presence_ttl = ms;
        }
        if let Some(ms) = parse_millis(&lookup, "CS_ABSENCE_TTL_MS")? {
            config.absence_ttl = ms;
        }
        if let Some(ms) = parse_millis(&lookup, "CS_LOCK_LEASE_MS")? {
            config.lock_lease = ms;
        }
        if let Some(ms) = parse_millis(&lookup, "CS_LOAD_TIMEOUT_MS")? {
            config.load_timeout = Some(ms);
        }
        if let Some(ms) = parse_millis(&lookup, "CS_CONTENTION_WAIT_MS")? {
            config.contention = ContentionPolicy::Wait { max_wait: ms };
        }
        if let Some(raw) = lookup("CS_RENEW_LEASE") {
            config.renew_lease = matches!(raw.trim(), "1" | "true" | "TRUE" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GuardError> {
        if self.presence_ttl.is_zero() {
            return Err(invalid("presence_ttl cannot be 0"));
        }
        if self.absence_ttl.is_zero() {
            return Err(invalid("absence_ttl cannot be 0"));
        }
        if self.lock_lease.is_zero() {
            return Err(invalid("lock_lease cannot be 0"));
        }
        if self.load_timeout.is_some_and(|t| t.is_zero()) {
            return Err(invalid("load_timeout cannot be 0"));
        }
        if let ContentionPolicy::Wait { max_wait } = self.contention {
            if max_wait.is_zero() {
                return Err(invalid("contention max_wait cannot be 0"));
            }
        }
        // Neither namespace may contain the other, or one key's lock record
        // could be read as another key's cache entry.
        if self.lock_prefix.starts_with(&self.cache_prefix)
            || self.cache_prefix.starts_with(&self.lock_prefix)
        {
            return Err(invalid("lock_prefix and cache_prefix must not overlap"));
        }
        Ok(())
    }
}

/// Builder for GuardConfig with validation
#[derive(Default)]
pub struct GuardConfigBuilder {
    presence_ttl: Option<Duration>,
    absence_ttl: Option<Duration>,
    lock_lease: Option<Duration>,
    load_timeout: Option<Duration>,
    contention: Option<ContentionPolicy>,
    renew_lease: Option<bool>,
    lock_prefix: Option<String>,
    cache_prefix: Option<String>,
}

impl GuardConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presence_ttl(mut self, ttl: Duration) -> Self {
        self.presence_ttl = Some(ttl);
        self
    }

    pub fn absence_ttl(mut self, ttl: Duration) -> Self {
        self.absence_ttl = Some(ttl);
        self
    }

    pub fn lock_lease(mut self, lease: Duration) -> Self {
        self.lock_lease = Some(lease);
        self
    }

    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    pub fn contention(mut self, policy: ContentionPolicy) -> Self {
        self.contention = Some(policy);
        self
    }

    /// Shorthand for `ContentionPolicy::Wait { max_wait }`
    pub fn wait_for_lock(self, max_wait: Duration) -> Self {
        self.contention(ContentionPolicy::Wait { max_wait })
    }

    pub fn renew_lease(mut self, renew: bool) -> Self {
        self.renew_lease = Some(renew);
        self
    }

    pub fn lock_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.lock_prefix = Some(prefix.into());
        self
    }

    pub fn cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = Some(prefix.into());
        self
    }

    /// Build the GuardConfig, validating all parameters
    pub fn build(self) -> Result<GuardConfig, GuardError> {
        let defaults = GuardConfig::default();

        let config = GuardConfig {
            presence_ttl: self.presence_ttl.unwrap_or(defaults.presence_ttl),
            absence_ttl: self.absence_ttl.unwrap_or(defaults.absence_ttl),
            lock_lease: self.lock_lease.unwrap_or(defaults.lock_lease),
            load_timeout: self.load_timeout.or(defaults.load_timeout),
            contention: self.contention.unwrap_or(defaults.contention),
            renew_lease: self.renew_lease.unwrap_or(defaults.renew_lease),
            lock_prefix: self.lock_prefix.unwrap_or(defaults.lock_prefix),
            cache_prefix: self.cache_prefix.unwrap_or(defaults.cache_prefix),
        };

        config.validate()?;
        Ok(config)
    }
}

fn invalid(msg: &str) -> GuardError {
    GuardError::InvalidParameters(msg.to_string())
}

fn parse_millis<F>(lookup: &F, name: &str) -> Result<Option<Duration>, GuardError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| {
                GuardError::InvalidParameters(format!(
                    "{} must be milliseconds, got '{}'",
                    name, raw
                ))
            }),
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod option_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}
