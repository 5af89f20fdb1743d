//! CLI configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via --config or SURREALKIT_CONFIG)
//! 3. Environment variables
//! 4. Command-line flags

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use surrealkit_client::{ConnectionConfig, HttpConfig, Session};
use surrealkit_protocol::{DEFAULT_PORT, RPC_PATH};
use thiserror::Error;

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server endpoints and timeouts.
    pub server: ServerConfig,
    /// Credentials and namespace selection.
    pub session: SessionConfig,
}

impl Config {
    /// Loads configuration from `path` (or `SURREALKIT_CONFIG`), then applies
    /// environment variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    fn load_with(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| lookup("SURREALKIT_CONFIG").map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(&lookup);
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        self.server.apply_overrides(lookup);
        self.session.apply_overrides(lookup);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server.url.starts_with("ws://") || self.server.url.starts_with("wss://")) {
            return Err(ConfigError::ValidationError(format!(
                "url must be a ws:// or wss:// address, got '{}'",
                self.server.url
            )));
        }
        if !(self.server.http_url.starts_with("http://")
            || self.server.http_url.starts_with("https://"))
        {
            return Err(ConfigError::ValidationError(format!(
                "http_url must be an http:// or https:// address, got '{}'",
                self.server.http_url
            )));
        }
        if self.server.connect_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "connect_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.session.namespace.is_empty() || self.session.database.is_empty() {
            return Err(ConfigError::ValidationError(
                "namespace and database must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn session(&self) -> Session {
        Session {
            namespace: self.session.namespace.clone(),
            database: self.session.database.clone(),
            username: self.session.username.clone(),
            password: self.session.password.clone(),
        }
    }

    /// Builds the WebSocket client configuration.
    pub fn connection_config(&self) -> ConnectionConfig {
        let mut config = ConnectionConfig::new(&self.server.url)
            .with_connect_timeout(self.server.connect_timeout())
            .with_request_timeout(self.server.request_timeout());
        config.session = self.session();
        config
    }

    /// Builds the HTTP client configuration.
    pub fn http_config(&self) -> HttpConfig {
        let mut config =
            HttpConfig::new(&self.server.http_url).with_timeout(self.server.request_timeout());
        config.session = self.session();
        config
    }
}

/// Server endpoints and timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// WebSocket RPC endpoint.
    pub url: String,
    /// Root of the HTTP endpoints.
    pub http_url: String,
    /// Connect (and handshake) timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Request timeout in seconds for both transports (0 = wait indefinitely).
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: format!("ws://127.0.0.1:{}{}", DEFAULT_PORT, RPC_PATH),
            http_url: format!("http://127.0.0.1:{}", DEFAULT_PORT),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SURREALKIT_URL") {
            self.url = url;
        }

        if let Some(url) = lookup("SURREALKIT_HTTP_URL") {
            self.http_url = url;
        }

        if let Some(timeout) = lookup("SURREALKIT_REQUEST_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.request_timeout_secs = secs;
            }
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Credentials and namespace selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let session = Session::default();
        Self {
            namespace: session.namespace,
            database: session.database,
            username: session.username,
            password: session.password,
        }
    }
}

impl SessionConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(ns) = lookup("SURREALKIT_NS") {
            self.namespace = ns;
        }
        if let Some(db) = lookup("SURREALKIT_DB") {
            self.database = db;
        }
        if let Some(user) = lookup("SURREALKIT_USER") {
            self.username = user;
        }
        if let Some(pass) = lookup("SURREALKIT_PASS") {
            self.password = pass;
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {1}", .0.display())]
    IoError(PathBuf, std::io::Error),

    #[error("failed to parse config file '{}': {1}", .0.display())]
    ParseError(PathBuf, String),

    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}
