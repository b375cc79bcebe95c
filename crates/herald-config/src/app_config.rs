//! Application configuration structures.

use herald_cache::CacheConfig;
use herald_core::TelemetryConfig;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeraldConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    pub name: String,
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "herald".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

impl AppMetadata {
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = HeraldConfig::default();
        assert_eq!(config.app.name, "herald");
        assert!(!config.app.is_production());
        assert_eq!(config.cache.default_ttl, Duration::from_secs(300));
        assert_eq!(config.cache.max_key_length, 256);
        assert!(config.telemetry.enabled);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: HeraldConfig =
            serde_json::from_str(r#"{"cache": {"default_ttl": 30}}"#).unwrap();
        assert_eq!(config.cache.default_ttl, Duration::from_secs(30));
        assert_eq!(config.cache.max_key_length, 256);
        assert!(config.cache.sweep_interval.is_none());
        assert_eq!(config.app.environment, "development");
    }
}
