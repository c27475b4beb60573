//! Configuration module for environment variables and application settings

use std::env;
use std::path::PathBuf;

use anyhow::{Result, anyhow};

#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind configuration
    pub server: ServerConfig,

    /// Gemini capability configuration
    pub ai: AiConfig,

    /// Upload staging configuration
    pub uploads: UploadConfig,

    /// Session lifetime in hours
    pub session_ttl_hours: i64,

    /// Mark the session cookie Secure (HTTPS-only deployments)
    pub cookie_secure: bool,

    /// Extra allowed CORS origin besides localhost
    pub cors_allowed_origin: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Gemini API key for text generation and image analysis
    pub api_key: String,

    /// Model identifier, e.g. "gemini-1.5-flash"
    pub model: String,

    /// Bound on one round trip to the model
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Transient staging directory, created at startup if absent
    pub dir: PathBuf,

    /// Request body cap for image uploads. Phone-camera JPEGs routinely
    /// run several megabytes, so this must sit well above axum's 2 MB
    /// default.
    pub max_bytes: usize,
}

/// Default upload cap: 20 MB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },

            ai: AiConfig {
                api_key: env::var("GEMINI_API_KEY")
                    .map_err(|_| anyhow!("GEMINI_API_KEY environment variable is required"))?,
                model: env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
                timeout_secs: env::var("GEMINI_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
            },

            uploads: UploadConfig {
                dir: env::var("UPLOAD_DIR")
                    .unwrap_or_else(|_| "uploads".to_string())
                    .into(),
                max_bytes: env::var("UPLOAD_MAX_BYTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            },

            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),

            cookie_secure: env::var("COOKIE_SECURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),

            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN").ok(),
        })
    }
}
