//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads an optional TOML file and deserializes it into strongly-typed
//! structs; every field has a default so the probe runs with no file at
//! all. Credentials are referenced by env-var name in the config and
//! resolved once at startup, before any network call.

use chrono::FixedOffset;
use reqwest::Url;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::types::{Credentials, ProbeError};

const DEFAULT_LOGIN_URL: &str = "http://myhome.tsinghua.edu.cn/default.aspx";
const DEFAULT_DETAILS_URL: &str =
    "http://myhome.tsinghua.edu.cn/Netweb_List/Netweb_Home_electricity_Detail.aspx";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub probe: ProbeConfig,
    pub portal: PortalConfig,
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProbeConfig {
    /// Measurement name at the start of the emitted line.
    pub metric_name: String,
    /// Per-request timeout applied by the HTTP client.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            metric_name: "electricity_balance".to_string(),
            timeout_secs: 30,
            user_agent: format!("flux-probe/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PortalConfig {
    pub login_url: String,
    pub details_url: String,
    /// Element id wrapping the remaining balance on the details page.
    pub balance_id: String,
    /// Element id wrapping the meter-reading time on the details page.
    pub timestamp_id: String,
    /// chrono format strings tried in order against the timestamp text.
    pub timestamp_formats: Vec<String>,
    /// Offset of the site's local time from UTC, in hours.
    pub utc_offset_hours: i32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            details_url: DEFAULT_DETAILS_URL.to_string(),
            balance_id: "Netweb_Home_electricity_DetailCtrl1_lblele".to_string(),
            timestamp_id: "Netweb_Home_electricity_DetailCtrl1_lbltime".to_string(),
            timestamp_formats: vec![
                "%Y-%m-%d %H:%M:%S".to_string(),
                "%Y/%m/%d %H:%M:%S".to_string(),
                "%Y-%m-%d %H:%M".to_string(),
            ],
            utc_offset_hours: 8,
        }
    }
}

impl PortalConfig {
    /// The site offset, limited to the ±14 h real time zones span.
    pub fn utc_offset(&self) -> Result<FixedOffset, ProbeError> {
        let hours = self.utc_offset_hours;
        (-14..=14)
            .contains(&hours)
            .then(|| hours.checked_mul(3600))
            .flatten()
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ProbeError::config(format!("portal.utc_offset_hours out of range: {hours}"))
            })
    }
}

/// Names of the environment variables holding the portal login.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CredentialsConfig {
    pub username_env: String,
    pub password_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            username_env: "FLUX_THU_USER".to_string(),
            password_env: "FLUX_THU_PASS".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProbeError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ProbeError::config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        toml::from_str(&contents).map_err(|e| {
            ProbeError::config(format!("failed to parse config file {}: {e}", path.display()))
        })
    }

    /// Load from `path` if it exists. A missing file is only an error when
    /// the caller named it explicitly.
    pub fn load_or_default(path: impl AsRef<Path>, explicit: bool) -> Result<Self, ProbeError> {
        let path = path.as_ref();
        if !explicit && !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ProbeError> {
        toml::from_str(contents)
            .map_err(|e| ProbeError::config(format!("failed to parse config: {e}")))
    }

    /// Check everything that can be checked without touching the network.
    pub fn validate(&self) -> Result<(), ProbeError> {
        let name = &self.probe.metric_name;
        if name.is_empty() || name.contains([' ', ',', '=']) {
            return Err(ProbeError::config(format!(
                "probe.metric_name must be non-empty without spaces, commas or '=': {name:?}"
            )));
        }
        if self.probe.timeout_secs == 0 {
            return Err(ProbeError::config("probe.timeout_secs must be greater than 0"));
        }

        for (key, value) in [
            ("portal.login_url", &self.portal.login_url),
            ("portal.details_url", &self.portal.details_url),
        ] {
            let url = Url::parse(value)
                .map_err(|e| ProbeError::config(format!("{key} is not a valid URL ({e}): {value}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ProbeError::config(format!("{key} must be http(s): {value}")));
            }
        }

        if self.portal.balance_id.is_empty() || self.portal.timestamp_id.is_empty() {
            return Err(ProbeError::config("portal element ids must be non-empty"));
        }
        if self.portal.timestamp_formats.is_empty() {
            return Err(ProbeError::config("portal.timestamp_formats must list at least one format"));
        }
        self.portal.utc_offset()?;
        Ok(())
    }

    /// Resolve credentials through `lookup` (env-var name to value).
    /// Missing or empty values are a configuration error.
    pub fn resolve_credentials<F>(&self, lookup: F) -> Result<Credentials, ProbeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ProbeError::config(format!("environment variable not set: {name}")))
        };
        let username = fetch(&self.credentials.username_env)?;
        let password = fetch(&self.credentials.password_env)?;
        Ok(Credentials::new(username, password))
    }
}
