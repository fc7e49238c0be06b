//! Configuration for the SSO broker.
//!
//! Configured via a TOML file with environment variable interpolation using
//! `${VAR_NAME}` syntax:
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [federation]
//! base_url = "https://federation.internal.example.com"
//! api_key = "${FEDERATION_API_KEY}"
//! external_url = "https://ops.wardhealth.example.com"
//! database_url = "${DATABASE_URL}"
//! ```

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable {0} referenced in config is not set")]
    MissingEnvVar(String),
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Federation backend connection. Required: the broker is useless
    /// without it.
    pub federation: FederationConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Opaque configuration handed to the federation backend at
/// gateway-initialization time. None of it participates in the core's own
/// logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FederationConfig {
    /// Base URL of the federation backend API.
    pub base_url: Url,
    /// API key for the backend.
    pub api_key: String,
    /// Public URL of this application, used by the backend to compute the
    /// default SAML audience and callback paths.
    pub external_url: Url,
    /// Key the backend uses to verify issued client secrets.
    #[serde(default)]
    pub client_secret_verifier: Option<String>,
    /// Database the backend persists connections in.
    #[serde(default)]
    pub database_url: Option<String>,
}

/// Session cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub duration_secs: u64,
    /// Set the `Secure` attribute on the cookie. Disable only for local
    /// development over plain HTTP.
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "ward_session".to_string(),
            duration_secs: 8 * 60 * 60,
            secure: true,
        }
    }
}

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex compiles"));

impl AppConfig {
    /// Load config from a TOML file, interpolating `${VAR}` references.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let interpolated = interpolate_env(&raw)?;
        Ok(toml::from_str(&interpolated)?)
    }
}

/// Replace `${VAR}` references with the named environment variables.
fn interpolate_env(raw: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(raw.len());
    let mut last_end = 0;
    for captures in ENV_VAR_PATTERN.captures_iter(raw) {
        let whole = captures.get(0).expect("capture 0 always present");
        let name = &captures[1];
        let value =
            std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        result.push_str(&raw[last_end..whole.start()]);
        result.push_str(&value);
        last_end = whole.end();
    }
    result.push_str(&raw[last_end..]);
    Ok(result)
}
