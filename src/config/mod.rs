//! Configuration loading for the integrations service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `PROJECTOS_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application configuration derived from `PROJECTOS_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,

    /// Public origin of the deployment, e.g. `https://projects.example.com`.
    /// Redirect URIs are computed from this; most OAuth features are inert
    /// without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_origin: Option<String>,

    /// 32-byte key (base64) for token-at-rest encryption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypto_key: Option<Vec<u8>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_client_secret: Option<String>,
    #[serde(default = "default_google_oauth_base")]
    pub google_oauth_base: String,
    #[serde(default = "default_google_token_base")]
    pub google_token_base: String,

    #[serde(default = "default_granola_discovery_url")]
    pub granola_discovery_url: String,
    /// Remote MCP endpoint serving meeting documents and transcripts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granola_mcp_url: Option<String>,
    /// Static bearer token used for the MCP endpoint when no OAuth token
    /// is stored for the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granola_mcp_token: Option<String>,

    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
    #[serde(default = "default_pending_ttl_minutes")]
    pub pending_ttl_minutes: i64,
    #[serde(default = "default_pending_sweep_interval_seconds")]
    pub pending_sweep_interval_seconds: u64,
}

fn default_profile() -> String {
    "dev".to_string()
}

fn default_api_bind_addr() -> String {
    "127.0.0.1:8084".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/projectos".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_google_oauth_base() -> String {
    "https://accounts.google.com".to_string()
}

fn default_google_token_base() -> String {
    "https://oauth2.googleapis.com".to_string()
}

fn default_granola_discovery_url() -> String {
    "https://api.granola.ai/.well-known/oauth-authorization-server".to_string()
}

fn default_http_timeout_seconds() -> u64 {
    30
}

fn default_pending_ttl_minutes() -> i64 {
    10
}

fn default_pending_sweep_interval_seconds() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            app_origin: None,
            crypto_key: None,
            google_client_id: None,
            google_client_secret: None,
            google_oauth_base: default_google_oauth_base(),
            google_token_base: default_google_token_base(),
            granola_discovery_url: default_granola_discovery_url(),
            granola_mcp_url: None,
            granola_mcp_token: None,
            http_timeout_seconds: default_http_timeout_seconds(),
            pending_ttl_minutes: default_pending_ttl_minutes(),
            pending_sweep_interval_seconds: default_pending_sweep_interval_seconds(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Redirect URI registered with / sent to a provider. `None` when the
    /// public origin is not configured.
    pub fn redirect_uri(&self, provider_slug: &str) -> Option<String> {
        self.app_origin
            .as_ref()
            .map(|origin| format!("{}/callback/{}", origin.trim_end_matches('/'), provider_slug))
    }

    /// Browser landing page after a connect attempt resolves.
    pub fn default_return_url(&self) -> String {
        match &self.app_origin {
            Some(origin) => format!("{}/integrations", origin.trim_end_matches('/')),
            None => "/integrations".to_string(),
        }
    }

    /// Validate cross-field constraints that cannot be expressed per-field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(key) = &self.crypto_key
            && key.len() != 32
        {
            return Err(ConfigError::InvalidCryptoKeyLength { length: key.len() });
        }
        if self.http_timeout_seconds == 0 || self.http_timeout_seconds > 300 {
            return Err(ConfigError::InvalidHttpTimeout {
                value: self.http_timeout_seconds,
            });
        }
        if !(1..=120).contains(&self.pending_ttl_minutes) {
            return Err(ConfigError::InvalidPendingTtl {
                value: self.pending_ttl_minutes,
            });
        }
        if self.pending_sweep_interval_seconds < 30 {
            return Err(ConfigError::InvalidSweepInterval {
                value: self.pending_sweep_interval_seconds,
            });
        }
        if let Some(origin) = &self.app_origin
            && url::Url::parse(origin).is_err()
        {
            return Err(ConfigError::InvalidAppOrigin {
                value: origin.clone(),
            });
        }
        Ok(())
    }

    /// Returns a redacted JSON representation (secrets are masked).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut masked = self.clone();
        if masked.crypto_key.is_some() {
            masked.crypto_key = Some(b"[REDACTED]".to_vec());
        }
        if masked.google_client_secret.is_some() {
            masked.google_client_secret = Some("[REDACTED]".to_string());
        }
        if masked.granola_mcp_token.is_some() {
            masked.granola_mcp_token = Some("[REDACTED]".to_string());
        }
        serde_json::to_string(&masked)
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("crypto key is invalid base64: {error}")]
    InvalidCryptoKeyBase64 { error: String },
    #[error("crypto key must decode to exactly 32 bytes, got {length} bytes")]
    InvalidCryptoKeyLength { length: usize },
    #[error("http timeout must be between 1 and 300 seconds, got {value}")]
    InvalidHttpTimeout { value: u64 },
    #[error("pending authorization TTL must be between 1 and 120 minutes, got {value}")]
    InvalidPendingTtl { value: i64 },
    #[error("pending sweep interval must be at least 30 seconds, got {value}")]
    InvalidSweepInterval { value: u64 },
    #[error("app origin '{value}' is not a valid URL")]
    InvalidAppOrigin { value: String },
}

/// Collected `PROJECTOS_*` values with the prefix stripped, later layers
/// shadowing earlier ones.
struct EnvValues(BTreeMap<String, String>);

impl EnvValues {
    fn insert_prefixed(&mut self, key: &str, value: String) {
        if let Some(stripped) = key.strip_prefix("PROJECTOS_") {
            self.0.insert(stripped.to_string(), value);
        }
    }

    /// Removes a key, treating empty/whitespace values as unset.
    fn take(&mut self, key: &str) -> Option<String> {
        let value = self.0.remove(key)?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn take_or(&mut self, key: &str, fallback: fn() -> String) -> String {
        self.take(key).unwrap_or_else(fallback)
    }

    fn take_parsed<T: std::str::FromStr>(&mut self, key: &str, fallback: fn() -> T) -> T {
        self.take(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(fallback)
    }
}

/// Loads configuration using layered `.env` files and `PROJECTOS_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Load and validate the configuration.
    ///
    /// Layering, weakest first: `.env`, `.env.local`, `.env.<profile>`,
    /// `.env.<profile>.local`, then the process environment.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut values = EnvValues(BTreeMap::new());

        self.read_env_file(&mut values, ".env")?;
        self.read_env_file(&mut values, ".env.local")?;

        let profile = env::var("PROJECTOS_PROFILE")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| values.0.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.read_env_file(&mut values, &format!(".env.{profile}"))?;
        self.read_env_file(&mut values, &format!(".env.{profile}.local"))?;

        for (key, value) in env::vars() {
            values.insert_prefixed(&key, value);
        }

        let crypto_key = match values.take("CRYPTO_KEY") {
            Some(encoded) => {
                use base64::{Engine as _, engine::general_purpose};
                let decoded = general_purpose::STANDARD.decode(&encoded).map_err(|e| {
                    ConfigError::InvalidCryptoKeyBase64 {
                        error: e.to_string(),
                    }
                })?;
                Some(decoded)
            }
            None => None,
        };

        let config = AppConfig {
            profile: values.take("PROFILE").unwrap_or(profile),
            api_bind_addr: values.take_or("API_BIND_ADDR", default_api_bind_addr),
            log_level: values.take_or("LOG_LEVEL", default_log_level),
            log_format: values.take_or("LOG_FORMAT", default_log_format),
            database_url: values.take_or("DATABASE_URL", default_database_url),
            db_max_connections: values.take_parsed("DB_MAX_CONNECTIONS", default_db_max_connections),
            db_acquire_timeout_ms: values
                .take_parsed("DB_ACQUIRE_TIMEOUT_MS", default_db_acquire_timeout_ms),
            app_origin: values.take("APP_ORIGIN"),
            crypto_key,
            google_client_id: values.take("GOOGLE_CLIENT_ID"),
            google_client_secret: values.take("GOOGLE_CLIENT_SECRET"),
            google_oauth_base: values.take_or("GOOGLE_OAUTH_BASE", default_google_oauth_base),
            google_token_base: values.take_or("GOOGLE_TOKEN_BASE", default_google_token_base),
            granola_discovery_url: values
                .take_or("GRANOLA_DISCOVERY_URL", default_granola_discovery_url),
            granola_mcp_url: values.take("GRANOLA_MCP_URL"),
            granola_mcp_token: values.take("GRANOLA_MCP_TOKEN"),
            http_timeout_seconds: values
                .take_parsed("HTTP_TIMEOUT_SECONDS", default_http_timeout_seconds),
            pending_ttl_minutes: values
                .take_parsed("PENDING_TTL_MINUTES", default_pending_ttl_minutes),
            pending_sweep_interval_seconds: values.take_parsed(
                "PENDING_SWEEP_INTERVAL_SECONDS",
                default_pending_sweep_interval_seconds,
            ),
        };

        config.bind_addr().map_err(|source| ConfigError::InvalidBindAddr {
            value: config.api_bind_addr.clone(),
            source,
        })?;
        config.validate()?;

        Ok(config)
    }

    fn read_env_file(&self, values: &mut EnvValues, name: &str) -> Result<(), ConfigError> {
        let path = self.base_dir.join(name);
        let entries = match dotenvy::from_path_iter(&path) {
            Ok(entries) => entries,
            // A missing layer file is simply skipped
            Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(());
            }
            Err(source) => return Err(ConfigError::EnvFile { path, source }),
        };

        for entry in entries {
            let (key, value) = entry.map_err(|source| ConfigError::EnvFile {
                path: path.clone(),
                source,
            })?;
            values.insert_prefixed(&key, value);
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
