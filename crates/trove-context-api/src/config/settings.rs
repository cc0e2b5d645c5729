use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub context: ContextConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite connection url, e.g. `sqlite://data/context.db` or `sqlite::memory:`
    pub url: String,
    pub pool_max_size: u32,
    pub pool_timeout_seconds: u64,
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/context.db".to_string(),
            pool_max_size: 8,
            pool_timeout_seconds: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ContextConfig {
    /// Max non-pinned entries per session
    pub max_tracked: usize,
    pub auto_clear_tracked_on_search: bool,
    pub grounding_limit: usize,
    pub grounding_snippet_chars: usize,
    pub grounding_max_tokens: usize,
    pub lock_timeout_ms: u64,
    /// Idle session expiry in hours, 0 keeps sessions forever
    pub session_ttl_hours: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tracked: 50,
            auto_clear_tracked_on_search: false,
            grounding_limit: 8,
            grounding_snippet_chars: 400,
            grounding_max_tokens: 1_500,
            lock_timeout_ms: 2_000,
            session_ttl_hours: 0,
            sweep_interval_seconds: 600,
        }
    }
}

impl ContextConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms.max(1))
    }

    pub fn session_ttl(&self) -> Option<Duration> {
        match self.session_ttl_hours {
            0 => None,
            hours => Some(Duration::from_secs(hours.saturating_mul(60 * 60))),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub header_name: String,
    pub cookie_max_age_days: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sid".to_string(),
            header_name: "x-session-id".to_string(),
            cookie_max_age_days: 30,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,trove_context_api=debug".to_string(),
            format: "pretty".to_string(),
            directory: "logs".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        settings.context.max_tracked = settings.context.max_tracked.max(1);
        Ok(settings)
    }
}
