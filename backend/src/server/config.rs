//! Application configuration loaded via OrthoConfig.
//!
//! Values layer CLI flags over `CAMPUS_*` environment variables over an
//! optional config file, with defaults suitable for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

/// Default bind address.
const DEFAULT_BIND: &str = "0.0.0.0:8080";
/// Default public site root used in verification URLs.
const DEFAULT_FRONTEND: &str = "https://campus.example";

/// Errors raised while resolving configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required value is missing.
    #[error("missing required configuration: {name}")]
    Missing {
        /// The `CAMPUS_*` name of the missing value.
        name: &'static str,
    },
    /// A value failed to parse.
    #[error("invalid configuration {name}: {message}")]
    Invalid {
        /// The `CAMPUS_*` name of the bad value.
        name: &'static str,
        /// Parse failure detail.
        message: String,
    },
}

/// Runtime settings for the Campus backend.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CAMPUS")]
pub struct AppConfig {
    /// PostgreSQL connection string. Required.
    pub database_url: Option<String>,
    /// Socket address to bind, `0.0.0.0:8080` by default.
    pub bind_addr: Option<String>,
    /// Public site root used to build certificate verification URLs.
    pub frontend_base_url: Option<String>,
    /// Payment processor API root. Required for paid courses.
    pub gateway_base_url: Option<String>,
    /// Payment processor access token.
    pub gateway_access_token: Option<String>,
    /// Certificate renderer endpoint; rendering is skipped when absent.
    pub renderer_url: Option<String>,
    /// File holding the cookie-session key; a throwaway key is generated
    /// in debug builds when missing.
    pub session_key_file: Option<PathBuf>,
    /// Whether session cookies require HTTPS. Defaults to true.
    pub cookie_secure: Option<bool>,
    /// Key tagging external payment references. Required.
    pub reference_signing_key: Option<String>,
}

impl AppConfig {
    /// The database URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when unset.
    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url.as_deref().ok_or(ConfigError::Missing {
            name: "CAMPUS_DATABASE_URL",
        })
    }

    /// The bind address, defaulting to `0.0.0.0:8080`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_BIND)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "CAMPUS_BIND_ADDR",
                message: e.to_string(),
            })
    }

    /// The public frontend root.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is not a URL.
    pub fn frontend_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(
            self.frontend_base_url
                .as_deref()
                .unwrap_or(DEFAULT_FRONTEND),
        )
        .map_err(|e| ConfigError::Invalid {
            name: "CAMPUS_FRONTEND_BASE_URL",
            message: e.to_string(),
        })
    }

    /// The payment processor root, when configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is not a URL.
    pub fn gateway_base_url(&self) -> Result<Option<Url>, ConfigError> {
        self.gateway_base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| ConfigError::Invalid {
                    name: "CAMPUS_GATEWAY_BASE_URL",
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    /// The certificate renderer endpoint, when configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is not a URL.
    pub fn renderer_url(&self) -> Result<Option<Url>, ConfigError> {
        self.renderer_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| ConfigError::Invalid {
                    name: "CAMPUS_RENDERER_URL",
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    /// Whether session cookies are HTTPS-only.
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure.unwrap_or(true)
    }

    /// The reference signing key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when unset.
    pub fn reference_signing_key(&self) -> Result<Vec<u8>, ConfigError> {
        self.reference_signing_key
            .as_deref()
            .map(|k| k.as_bytes().to_vec())
            .ok_or(ConfigError::Missing {
                name: "CAMPUS_REFERENCE_SIGNING_KEY",
            })
    }
}
