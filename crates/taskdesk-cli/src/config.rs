use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use taskdesk_core::api::HttpTaskApi;
use taskdesk_core::models::{EngineConfig, Role, Viewer, ViewKind};
use taskdesk_core::timezone::parse_timezone;
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = "taskdesk.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("api.base_url is not set (add it to {DEFAULT_CONFIG_FILE} or set TASKDESK_API__BASE_URL)")]
    MissingBaseUrl,

    #[error("viewer.user_id is required for the '{0}' role")]
    MissingUserId(Role),

    #[error("{0}")]
    Invalid(String),
}

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub engine: EngineSettings,
}

#[derive(Deserialize, Debug, Default)]
pub struct ApiConfig {
    /// Root of the task API, e.g. `https://host/api/tasks`
    pub base_url: Option<String>,
    #[serde(default)]
    pub company_id: String,
    /// Bearer token
    pub token: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ViewerConfig {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub role: Role,
    /// IANA timezone used for "today" and date ranges
    #[serde(default = "detect_system_timezone")]
    pub timezone: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            role: Role::default(),
            timezone: detect_system_timezone(),
        }
    }
}

/// Engine tuning as written in the config file
#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct EngineSettings {
    pub page_size: usize,
    pub short_ttl_minutes: u64,
    pub long_ttl_minutes: u64,
    pub search_debounce_ms: u64,
    pub date_debounce_ms: u64,
    pub fallback_limit: usize,
    pub retention_days: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            page_size: defaults.page_size,
            short_ttl_minutes: defaults.short_ttl.as_secs() / 60,
            long_ttl_minutes: defaults.long_ttl.as_secs() / 60,
            search_debounce_ms: defaults.search_debounce.as_millis() as u64,
            date_debounce_ms: defaults.date_debounce.as_millis() as u64,
            fallback_limit: defaults.fallback_limit,
            retention_days: defaults.retention_days,
        }
    }
}

impl EngineSettings {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            page_size: self.page_size.max(1),
            short_ttl: Duration::from_secs(self.short_ttl_minutes * 60),
            long_ttl: Duration::from_secs(self.long_ttl_minutes * 60),
            search_debounce: Duration::from_millis(self.search_debounce_ms),
            date_debounce: Duration::from_millis(self.date_debounce_ms),
            fallback_limit: self.fallback_limit,
            retention_days: self.retention_days,
        }
    }
}

impl Config {
    /// `taskdesk.toml` (or `TASKDESK_CONFIG`), overridden by `TASKDESK_*`
    /// variables. Nested keys use `__`, e.g. `TASKDESK_API__BASE_URL`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("TASKDESK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::figment(path).extract().map_err(ConfigError::from)
    }

    fn figment(path: PathBuf) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("TASKDESK_").ignore(&["config", "log"]).split("__"))
    }

    pub fn api_client(&self, view: ViewKind) -> Result<HttpTaskApi, ConfigError> {
        let base_url = self
            .api
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingBaseUrl)?;
        let api = HttpTaskApi::new(base_url, view, self.api.company_id.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(match &self.api.token {
            Some(token) => api.with_token(token.clone()),
            None => api,
        })
    }

    pub fn viewer(&self) -> Result<Viewer, ConfigError> {
        let role = self.viewer.role;
        if !role.is_privileged() && self.viewer.user_id.trim().is_empty() {
            return Err(ConfigError::MissingUserId(role));
        }
        Ok(Viewer::new(self.viewer.user_id.trim(), role))
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        parse_timezone(&self.viewer.timezone).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Detects the system timezone, falling back to UTC if detection fails
pub fn detect_system_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if !tz.is_empty() && parse_timezone(&tz).is_ok() {
            return tz;
        }
    }

    if let Ok(tz) = iana_time_zone::get_timezone() {
        if parse_timezone(&tz).is_ok() {
            return tz;
        }
    }

    "UTC".to_string()
}
