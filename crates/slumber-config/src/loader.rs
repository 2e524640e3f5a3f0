//! Configuration loader with layered sources.

use crate::AppConfig;
use config::{Config, ConfigError, Environment, File};
use slumber_core::SlumberError;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Configuration loaded once from layered sources.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<AppConfig>,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides
    /// 4. Environment variables such as `SLUMBER__SERVER__PORT`
    pub fn new(config_dir: impl AsRef<str>) -> Result<Self, SlumberError> {
        let config = Self::load_config(config_dir.as_ref())?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, SlumberError> {
        Self::new("./config")
    }

    /// Returns the loaded configuration.
    #[must_use]
    pub fn get(&self) -> AppConfig {
        (*self.config).clone()
    }

    fn load_config(config_dir: &str) -> Result<AppConfig, SlumberError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var("SLUMBER_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        for name in ["default", environment.as_str(), "local"] {
            let path = format!("{config_dir}/{name}.toml");
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("SLUMBER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_slumber_error)?;
        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(config_error_to_slumber_error)?;

        validate_config(&app_config)?;
        Ok(app_config)
    }

    /// Gets a specific configuration value by key path.
    pub fn get_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let json = serde_json::to_value(&*self.config).ok()?;

        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }

        serde_json::from_value(current.clone()).ok()
    }
}

/// Validates a loaded configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), SlumberError> {
    let root = &config.server.root;
    if !root.starts_with('/') || !root.ends_with('/') {
        return Err(SlumberError::Configuration(format!(
            "server.root must start and end with '/', got {root:?}"
        )));
    }

    for (name, base) in &config.connector.services {
        Url::parse(base).map_err(|e| {
            SlumberError::Configuration(format!("connector.services.{name} is not a URL: {e}"))
        })?;
    }

    let auth = &config.authentication;
    if auth.enabled && !config.connector.services.contains_key(&auth.service) {
        // The backend reports ImproperlyConfigured per request.
        warn!(
            service = %auth.service,
            "Authentication is enabled but its service is not configured"
        );
    }

    Ok(())
}

fn config_error_to_slumber_error(err: ConfigError) -> SlumberError {
    SlumberError::Configuration(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerConfig;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.root, "/slumber/");
        assert!(!config.server.debug);
        assert_eq!(config.authentication.header, "X-FOST-USER");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_server_address() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_root_must_be_slash_delimited() {
        let mut config = AppConfig::default();
        config.server.root = "slumber".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(SlumberError::Configuration(_))
        ));
    }

    #[test]
    fn test_service_urls_must_parse() {
        let mut config = AppConfig::default();
        config
            .connector
            .services
            .insert("auth".to_string(), "not a url".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            r#"
[server]
port = 9000
debug = true

[connector.services]
auth = "http://auth.example.com/slumber/"

[authentication]
enabled = true
"#,
        )
        .unwrap();

        let loader = ConfigLoader::new(dir.path().to_string_lossy()).unwrap();
        let config = loader.get();

        assert_eq!(config.server.port, 9000);
        assert!(config.server.debug);
        assert_eq!(config.server.root, "/slumber/");
        assert!(config.authentication.enabled);
        assert_eq!(
            config.connector.services.get("auth").map(String::as_str),
            Some("http://auth.example.com/slumber/")
        );
        assert_eq!(loader.get_value::<u16>("server.port"), Some(9000));
    }
}
