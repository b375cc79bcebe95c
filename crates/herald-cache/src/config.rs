//! Cache configuration and per-entry options.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default TTL for cached results (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default maximum cache key length in bytes.
pub const DEFAULT_MAX_KEY_LENGTH: usize = 256;

/// Configuration for a result cache instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL applied when a caller does not pass one.
    #[serde(default = "default_ttl", with = "duration_secs")]
    pub default_ttl: Duration,

    /// Longest accepted key, in bytes.
    #[serde(default = "default_max_key_length")]
    pub max_key_length: usize,

    /// Period of the background sweep of expired entries.
    /// `None` disables the sweep; expiry is then purely lazy.
    #[serde(default, with = "option_duration_secs")]
    pub sweep_interval: Option<Duration>,
}

fn default_ttl() -> Duration {
    DEFAULT_TTL
}

fn default_max_key_length() -> usize {
    DEFAULT_MAX_KEY_LENGTH
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            sweep_interval: None,
        }
    }
}

impl CacheConfig {
    /// Set the default TTL.
    #[must_use]
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the maximum key length.
    #[must_use]
    pub fn max_key_length(mut self, max_key_length: usize) -> Self {
        self.max_key_length = max_key_length;
        self
    }

    /// Enable the background sweep.
    #[must_use]
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }
}

/// Options for a single cached entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOptions {
    /// Time-to-live of the entry.
    pub ttl: Duration,
    /// Tags for group invalidation.
    pub tags: Vec<String>,
}

impl EntryOptions {
    /// Options with the given TTL and no tags.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tags: Vec::new(),
        }
    }

    /// Attach tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

mod duration_secs {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

mod option_duration_secs {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::ref_option)]
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
            .map(Duration::try_from_secs_f64)
            .transpose()
            .map_err(D::Error::custom)
    }
}
