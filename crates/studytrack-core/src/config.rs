//! Configuration: `~/.studytrack/config.toml` with environment overrides.

use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyTrackError};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyTrackConfig {
    /// `development` or `production`; reported by the health endpoint.
    pub environment: String,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub evolution: EvolutionConfig,
    pub webhook: WebhookConfig,
    pub schedule: ScheduleConfig,
}

impl Default for StudyTrackConfig {
    fn default() -> Self {
        Self {
            environment: "development".into(),
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            evolution: EvolutionConfig::default(),
            webhook: WebhookConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 5000 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Supabase,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub sqlite_path: String,
    /// Per-request timeout for the hosted store.
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Supabase,
            supabase_url: None,
            supabase_service_key: None,
            sqlite_path: "~/.studytrack/studytrack.db".into(),
            timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    /// SQLite path with `~` expanded.
    pub fn sqlite_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.sqlite_path).to_string())
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

/// Evolution API (WhatsApp gateway) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub instance_name: String,
    pub timeout_secs: u64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            api_key: None,
            instance_name: "studytrack-instance".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared secret for the `hub.verify_token` handshake.
    pub verify_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Local wall-clock time ("HH:MM") for the in-process daily trigger.
    pub daily_at: Option<String>,
}

impl ScheduleConfig {
    pub fn daily_at(&self) -> Result<Option<NaiveTime>> {
        match self.daily_at.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => NaiveTime::parse_from_str(raw, "%H:%M")
                .map(Some)
                .map_err(|e| StudyTrackError::config(format!("schedule.daily_at '{raw}': {e}"))),
        }
    }
}

impl StudyTrackConfig {
    /// `~/.studytrack`
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".studytrack")
    }

    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Load from the default path (defaults if absent), then apply env overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::parse_file(&path)?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from an explicit path, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StudyTrackError::ConfigNotFound(path.display().to_string()));
        }
        let mut config = Self::parse_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| StudyTrackError::config(format!("{}: {e}", path.display())))
    }

    /// Overlay environment variables. `lookup` is injectable for tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("STUDYTRACK_ENV") {
            self.environment = v;
        }
        if let Some(port) = get("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(v) = get("SUPABASE_URL") {
            self.store.supabase_url = Some(v);
        }
        if let Some(v) = get("SUPABASE_SERVICE_KEY") {
            self.store.supabase_service_key = Some(v);
        }
        if let Some(v) = get("EVOLUTION_BASE_URL") {
            self.evolution.base_url = v;
        }
        if let Some(v) = get("EVOLUTION_API_KEY") {
            self.evolution.api_key = Some(v);
        }
        if let Some(v) = get("EVOLUTION_INSTANCE_NAME") {
            self.evolution.instance_name = v;
        }
        if let Some(v) = get("META_VERIFY_TOKEN") {
            self.webhook.verify_token = Some(v);
        }
    }

    /// Check that everything needed to serve is present.
    pub fn validate(&self) -> Result<()> {
        fn present(v: &Option<String>) -> bool {
            v.as_deref().is_some_and(|s| !s.trim().is_empty())
        }

        if self.store.backend == StoreBackend::Supabase {
            if !present(&self.store.supabase_url) {
                return Err(StudyTrackError::config("store.supabase_url (SUPABASE_URL) is required"));
            }
            if !present(&self.store.supabase_service_key) {
                return Err(StudyTrackError::config(
                    "store.supabase_service_key (SUPABASE_SERVICE_KEY) is required",
                ));
            }
        }
        if !present(&self.evolution.api_key) {
            return Err(StudyTrackError::config("evolution.api_key (EVOLUTION_API_KEY) is required"));
        }
        if self.evolution.base_url.trim().is_empty() {
            return Err(StudyTrackError::config("evolution.base_url must not be empty"));
        }
        self.schedule.daily_at()?;
        Ok(())
    }

    /// TOML rendering with secrets replaced by `***`.
    pub fn to_masked_toml(&self) -> Result<String> {
        let mut masked = self.clone();
        let mask = |v: &mut Option<String>| {
            if v.is_some() {
                *v = Some("***".into());
            }
        };
        mask(&mut masked.store.supabase_service_key);
        mask(&mut masked.evolution.api_key);
        mask(&mut masked.webhook.verify_token);
        toml::to_string_pretty(&masked).map_err(|e| StudyTrackError::Other(e.to_string()))
    }
}
