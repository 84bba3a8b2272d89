//! Application configuration management.
//!
//! Configuration is loaded from an optional YAML file with environment variable overrides. The
//! configuration file path defaults to `config.yaml` but can be specified via `-f` flag or
//! `SQUEEZE_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **Defaults** - see the `Default` implementation of [`Config`]
//! 2. **YAML config file** - (default: `config.yaml`, skipped when absent)
//! 3. **Environment variables** - Variables prefixed with `SQUEEZE_` override YAML values
//! 4. **ALLOWED_ORIGIN / NODE_ENV** - Special case: map onto `allowed_origin` and `environment`
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! SQUEEZE_PORT=9000
//!
//! # Production CORS origin, also used to build absolute download URLs
//! NODE_ENV=production
//! ALLOWED_ORIGIN=https://squeeze.example.com
//!
//! # Raise the upload ceiling to 20 MiB
//! SQUEEZE_MAX_UPLOAD_SIZE=20971520
//! ```

use axum::http::HeaderValue;
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::errors::Error;

/// Origin allowed in development when nothing else is configured.
pub const DEFAULT_DEV_ORIGIN: &str = "http://localhost:4321";

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "SQUEEZE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Deployment environment, selected by `NODE_ENV`.
///
/// Anything other than `production` is treated as development.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl From<String> for Environment {
    fn from(value: String) -> Self {
        if value == "production" {
            Environment::Production
        } else {
            Environment::Development
        }
    }
}

impl From<Environment> for String {
    fn from(value: Environment) -> Self {
        match value {
            Environment::Development => "development".to_string(),
            Environment::Production => "production".to_string(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Main application configuration.
///
/// All fields have defaults defined in the `Default` implementation, so an empty
/// environment yields a working development server on port 8080.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Deployment environment; `production` switches CORS to `allowed_origin`
    pub environment: Environment,
    /// Origin allowed by CORS in production, and the default download URL base
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origin: Option<String>,
    /// Origin allowed by CORS outside production
    pub dev_origin: String,
    /// Base for download URLs. Falls back to `allowed_origin`, then to relative URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_base_url: Option<String>,
    /// Directory compressed artifacts are written to and served from
    pub output_dir: PathBuf,
    /// Maximum accepted request body for uploads, in bytes
    pub max_upload_size: usize,
    /// Quality used when the client omits `quality` or sends an invalid value
    pub default_quality: u32,
    /// Maximum time to receive the request body
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
    /// Maximum time to produce a response
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: Environment::Development,
            allowed_origin: None,
            dev_origin: DEFAULT_DEV_ORIGIN.to_string(),
            download_base_url: None,
            output_dir: PathBuf::from("compressed"),
            max_upload_size: 10 << 20,
            default_quality: 75,
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(20),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            // Load base config file (missing files are ignored by figment)
            .merge(Yaml::file(&args.config))
            // SQUEEZE_CONFIG is consumed by clap, not by the config itself
            .merge(Env::prefixed("SQUEEZE_").ignore(&["CONFIG"]).split("__"))
            // Bare names kept for compatibility with existing deployments
            .merge(Env::raw().only(&["ALLOWED_ORIGIN"]))
            .merge(Env::raw().only(&["NODE_ENV"]).map(|_| "environment".into()))
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_upload_size == 0 {
            return Err(Error::InvalidConfig {
                message: "max_upload_size must be greater than 0".to_string(),
            });
        }

        if !(1..=100).contains(&self.default_quality) {
            return Err(Error::InvalidConfig {
                message: format!(
                    "default_quality must be between 1 and 100 (got {})",
                    self.default_quality
                ),
            });
        }

        if self.read_timeout.is_zero() || self.write_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                message: "read_timeout and write_timeout must be non-zero".to_string(),
            });
        }

        if self.cors_origin().parse::<HeaderValue>().is_err() {
            return Err(Error::InvalidConfig {
                message: format!("CORS origin '{}' is not a valid header value", self.cors_origin()),
            });
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Origin sent in `Access-Control-Allow-Origin`.
    ///
    /// In production an empty or missing `allowed_origin` falls back to the dev origin.
    pub fn cors_origin(&self) -> &str {
        match self.allowed_origin.as_deref() {
            Some(origin) if self.is_production() && !origin.is_empty() => origin,
            _ => &self.dev_origin,
        }
    }

    /// Public URL for a stored artifact.
    pub fn download_url(&self, filename: &str) -> String {
        let base = self
            .download_base_url
            .as_deref()
            .or(self.allowed_origin.as_deref())
            .unwrap_or("")
            .trim_end_matches('/');
        format!("{base}/download/{filename}")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
