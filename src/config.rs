use std::{fs, path::Path, time::Duration};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("missing {0}; set it in the config file or environment")]
    Missing(&'static str),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    /// IANA zone used when displaying event dates. UTC when unset.
    pub display_timezone: Option<String>,
    /// No timeout at all when unset.
    pub request_timeout_secs: Option<u64>,
    /// JSON snapshot served instead of the hosted store (offline demo).
    pub fixture_path: Option<String>,
}

/// Settings the remote source cannot start without.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSettings {
    pub project_url: String,
    pub anon_key: String,
    pub timeout: Option<Duration>,
}

impl SiteConfig {
    /// File at [`utils::config_path`], then environment overrides on top.
    pub fn load() -> Result<Self, ConfigError> {
        let path = utils::config_path();
        let mut config = read_config(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(url) = get("SUPABASE_URL") {
            self.supabase_url = Some(url);
        }
        if let Some(key) = get("SUPABASE_ANON_KEY") {
            self.supabase_anon_key = Some(key);
        }
        if let Some(tz) = get("CLUB_SITE_TIMEZONE") {
            self.display_timezone = Some(tz);
        }
        if let Some(path) = get("CLUB_SITE_FIXTURE") {
            self.fixture_path = Some(path);
        }
        if let Some(secs) = get("CLUB_SITE_TIMEOUT_SECS").and_then(|s| s.trim().parse().ok()) {
            self.request_timeout_secs = Some(secs);
        }
    }

    pub fn remote(&self) -> Result<RemoteSettings, ConfigError> {
        let project_url = required(&self.supabase_url, "supabase_url")?;
        let anon_key = required(&self.supabase_anon_key, "supabase_anon_key")?;
        let timeout = match self.request_timeout_secs {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    field: "request_timeout_secs",
                    reason: "must be greater than zero".to_string(),
                })
            }
            other => other.map(Duration::from_secs),
        };
        Ok(RemoteSettings {
            project_url,
            anon_key,
            timeout,
        })
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        match self.display_timezone.as_deref().map(str::trim) {
            None | Some("") => Ok(Tz::UTC),
            Some(name) => name.parse::<Tz>().map_err(|err| ConfigError::Invalid {
                field: "display_timezone",
                reason: err.to_string(),
            }),
        }
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::Missing(field))
}

fn read_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using environment only");
        return Ok(SiteConfig::default());
    }
    let read_err = |reason: String| ConfigError::Read {
        path: path.display().to_string(),
        reason,
    };
    let contents = fs::read_to_string(path).map_err(|err| read_err(err.to_string()))?;
    serde_json::from_str(&contents).map_err(|err| read_err(err.to_string()))
}
