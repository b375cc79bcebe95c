//! Configuration loader with layered sources.

use crate::HeraldConfig;
use config::{Config, ConfigError, Environment, File};
use herald_core::{HeraldError, HeraldResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Environment variable selecting the `{environment}.toml` layer.
pub const ENVIRONMENT_VAR: &str = "HERALD_ENVIRONMENT";

/// Configuration loader with runtime reload support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<HeraldConfig>>,
    config_dir: PathBuf,
    environment: String,
}

impl ConfigLoader {
    /// Creates a loader for `config_dir`, picking the environment from
    /// `HERALD_ENVIRONMENT` (default `development`).
    ///
    /// Sources, later ones overriding earlier ones:
    /// 1. `default.toml`
    /// 2. `{environment}.toml`
    /// 3. `local.toml` (not committed to version control)
    /// 4. Environment variables such as `HERALD__CACHE__DEFAULT_TTL`
    pub fn new(config_dir: impl Into<PathBuf>) -> HeraldResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file loaded: {}", e);
        }
        let environment =
            std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_string());
        Self::with_environment(config_dir, environment)
    }

    /// Creates a loader for an explicit environment name.
    pub fn with_environment(
        config_dir: impl Into<PathBuf>,
        environment: impl Into<String>,
    ) -> HeraldResult<Self> {
        let config_dir = config_dir.into();
        let environment = environment.into();
        let config = Self::load_config(&config_dir, &environment)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
            environment,
        })
    }

    /// Loads configuration from `./config`.
    pub fn from_default_location() -> HeraldResult<Self> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> HeraldConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk. The previous configuration is
    /// kept if the new one fails to load or validate.
    pub async fn reload(&self) -> HeraldResult<()> {
        let new_config = Self::load_config(&self.config_dir, &self.environment)?;
        *self.config.write().await = new_config;
        info!("Configuration reloaded");
        Ok(())
    }

    /// Gets a value by dotted key path, e.g. `cache.max_key_length`.
    pub async fn get_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let config = self.config.read().await;
        let json = serde_json::to_value(&*config).ok()?;

        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }

        serde_json::from_value(current.clone()).ok()
    }

    fn load_config(config_dir: &Path, environment: &str) -> HeraldResult<HeraldConfig> {
        info!(environment, config_dir = %config_dir.display(), "Loading configuration");

        let mut builder = Config::builder();

        for layer in ["default", environment, "local"] {
            let path = config_dir.join(format!("{layer}.toml"));
            if path.exists() {
                debug!("Loading config layer from: {}", path.display());
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("HERALD")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: HeraldConfig = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(config_error)?;
        config.app.environment = environment.to_string();

        Self::validate_config(&config)?;
        Ok(config)
    }

    fn validate_config(config: &HeraldConfig) -> HeraldResult<()> {
        if config.cache.default_ttl.is_zero() {
            return Err(HeraldError::Configuration(
                "cache.default_ttl must be positive".to_string(),
            ));
        }

        if config.cache.max_key_length == 0 {
            return Err(HeraldError::Configuration(
                "cache.max_key_length must be at least 1".to_string(),
            ));
        }

        if config.cache.sweep_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(HeraldError::Configuration(
                "cache.sweep_interval must be positive when set".to_string(),
            ));
        }

        if config.app.is_production() && config.telemetry.filter.contains("debug") {
            warn!("Debug logging enabled in production");
        }

        Ok(())
    }
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("config_dir", &self.config_dir)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

fn config_error(err: ConfigError) -> HeraldError {
    HeraldError::Configuration(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    #[tokio::test]
    async fn test_missing_files_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_environment(dir.path(), "test").unwrap();

        let config = loader.get().await;
        assert_eq!(config.cache.default_ttl, Duration::from_secs(300));
        assert_eq!(config.app.environment, "test");
    }

    #[tokio::test]
    async fn test_layers_override_in_order() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "default.toml",
            "[app]\nname = \"wallet\"\nversion = \"1.0.0\"\nenvironment = \"development\"\n\n[cache]\ndefault_ttl = 60\nmax_key_length = 128\n",
        );
        write(&dir, "staging.toml", "[cache]\ndefault_ttl = 30\n");
        write(&dir, "local.toml", "[cache]\nsweep_interval = 15\n");

        let loader = ConfigLoader::with_environment(dir.path(), "staging").unwrap();
        let config = loader.get().await;

        assert_eq!(config.app.name, "wallet");
        assert_eq!(config.app.environment, "staging");
        assert_eq!(config.cache.default_ttl, Duration::from_secs(30));
        assert_eq!(config.cache.max_key_length, 128);
        assert_eq!(config.cache.sweep_interval, Some(Duration::from_secs(15)));
    }

    #[tokio::test]
    async fn test_other_environment_layer_is_ignored() {
        let dir = TempDir::new().unwrap();
        write(&dir, "production.toml", "[cache]\ndefault_ttl = 900\n");

        let loader = ConfigLoader::with_environment(dir.path(), "development").unwrap();
        assert_eq!(loader.get().await.cache.default_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[cache]\ndefault_ttl = 0\n");

        let err = ConfigLoader::with_environment(dir.path(), "test").unwrap_err();
        assert!(matches!(err, HeraldError::Configuration(_)));
        assert!(err.to_string().contains("default_ttl"));
    }

    #[test]
    fn test_zero_key_length_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[cache]\nmax_key_length = 0\n");

        let err = ConfigLoader::with_environment(dir.path(), "test").unwrap_err();
        assert!(err.to_string().contains("max_key_length"));
    }

    #[test]
    fn test_malformed_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[cache\ndefault_ttl = ");

        let err = ConfigLoader::with_environment(dir.path(), "test").unwrap_err();
        assert!(matches!(err, HeraldError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_reload_picks_up_changes() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[cache]\ndefault_ttl = 60\n");
        let loader = ConfigLoader::with_environment(dir.path(), "test").unwrap();

        write(&dir, "default.toml", "[cache]\ndefault_ttl = 120\n");
        loader.reload().await.unwrap();
        assert_eq!(loader.get().await.cache.default_ttl, Duration::from_secs(120));

        write(&dir, "default.toml", "[cache]\ndefault_ttl = 0\n");
        assert!(loader.reload().await.is_err());
        assert_eq!(loader.get().await.cache.default_ttl, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_get_value_by_path() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[telemetry]\njson = true\n");
        let loader = ConfigLoader::with_environment(dir.path(), "test").unwrap();

        assert_eq!(loader.get_value::<bool>("telemetry.json").await, Some(true));
        assert_eq!(loader.get_value::<u64>("cache.max_key_length").await, Some(256));
        assert_eq!(loader.get_value::<u64>("cache.missing").await, None);
    }
}
