//! Application configuration structures.

use serde::{Deserialize, Serialize};
use slumber_core::{LogFormat, TracingConfig};
use std::collections::BTreeMap;
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Remote services the connector talks to.
    #[serde(default)]
    pub connector: ConnectorConfig,

    /// Remote-user authentication backend.
    #[serde(default)]
    pub authentication: AuthenticationConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "slumber".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Applications root every model path is served under.
    pub root: String,
    /// Pretty-print JSON responses.
    pub debug: bool,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Enable CORS.
    pub cors_enabled: bool,
    /// CORS allowed origins.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            root: "/slumber/".to_string(),
            debug: false,
            request_timeout_secs: 30,
            cors_enabled: false,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    /// Returns the bind address.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the request timeout as a Duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Service name to the absolute URL of that service's applications root.
    pub services: BTreeMap<String, String>,
    /// HTTP timeout for remote fetches in seconds.
    pub timeout_secs: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            services: BTreeMap::new(),
            timeout_secs: 30,
        }
    }
}

impl ConnectorConfig {
    /// Returns the HTTP timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Remote-user authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticationConfig {
    /// Install the remote-user middleware.
    pub enabled: bool,
    /// Header carrying the externally asserted username.
    pub header: String,
    /// Connector service holding the user model.
    pub service: String,
    /// Path of the user model within that service.
    pub user_model: String,
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            header: "X-FOST-USER".to_string(),
            service: "auth".to_string(),
            user_model: "django/contrib/auth/User/".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter (trace, debug, info, warn, error or directives).
    pub log_level: String,
    /// Log format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info,slumber=debug,tower_http=debug".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ObservabilityConfig {
    /// Converts to the tracing initialiser's configuration.
    #[must_use]
    pub fn tracing(&self) -> TracingConfig {
        TracingConfig {
            filter: self.log_level.clone(),
            format: self.log_format,
        }
    }
}
