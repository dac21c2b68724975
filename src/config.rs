//! Service configuration
//!
//! Values come from the process environment, which `init()` seeds from a `.env`
//! file via dotenvy. Command-line flags override individual fields.

use crate::error::{ClientError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default analysis service location
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Per-request timeout when none is configured
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the analysis service, without trailing slash
    pub api_base: String,
    /// Upper bound for a single request, including body transfer
    pub timeout: Duration,
    /// Where exported files are written
    pub export_dir: PathBuf,
    /// Where the demo login session is persisted
    pub session_dir: PathBuf,
}

impl ServiceConfig {
    /// Build the configuration from environment variables.
    ///
    /// `HEALTHMORPH_API_BASE` wins over the legacy `VITE_API_BASE`.
    pub fn from_env() -> Result<Self> {
        let api_base = std::env::var("HEALTHMORPH_API_BASE")
            .or_else(|_| std::env::var("VITE_API_BASE"))
            .unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        let timeout = match std::env::var("HEALTHMORPH_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout(&raw)?,
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let export_dir = std::env::var("HEALTHMORPH_EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_export_dir());

        let session_dir = std::env::var("HEALTHMORPH_SESSION_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_session_dir());

        Ok(Self {
            api_base: normalize_base(&api_base)?,
            timeout,
            export_dir,
            session_dir,
        })
    }

    pub fn with_api_base(mut self, api_base: &str) -> Result<Self> {
        self.api_base = normalize_base(api_base)?;
        Ok(self)
    }

    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.export_dir = dir;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve a service-relative path (such as a heatmap URL) against the base.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.api_base, path)
        } else {
            format!("{}/{}", self.api_base, path)
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            export_dir: default_export_dir(),
            session_dir: default_session_dir(),
        }
    }
}

fn normalize_base(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ClientError::Config(format!(
            "API base must be an http(s) URL, got '{}'",
            raw
        )));
    }
    Ok(trimmed.to_string())
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| ClientError::Config(format!("Invalid timeout '{}'", raw)))?;
    if secs == 0 {
        return Err(ClientError::Config("Timeout must be at least 1 second".to_string()));
    }
    Ok(Duration::from_secs(secs))
}

fn default_export_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_session_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("healthmorph"))
        .unwrap_or_else(|| PathBuf::from(".healthmorph"))
}
