use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable that overrides `marketplace.api_token`.
pub const MARKETPLACE_TOKEN_ENV: &str = "SWIPECART_MARKETPLACE_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub marketplace: MarketplaceConfig,

    pub cache: CacheConfig,

    pub sessions: SessionConfig,

    pub freshness: FreshnessConfig,

    pub queue: QueueConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// "text" or "json"
    pub log_format: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/swipecart.db".to_string(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 7410,
            cors_allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    pub base_url: String,

    pub marketplace_id: String,

    /// OAuth application token. Prefer setting it through the environment.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_token: String,

    pub request_timeout_seconds: u64,

    /// Items requested per upstream search call. Kept large and fixed so that
    /// clients asking for different page sizes still share cache entries.
    pub upstream_page_size: u32,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.ebay.com".to_string(),
            marketplace_id: "EBAY_US".to_string(),
            api_token: String::new(),
            request_timeout_seconds: 15,
            upstream_page_size: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub search_ttl_minutes: u64,

    /// Top of the UI price slider. A max price at or above this value means
    /// "no upper bound".
    pub price_ceiling: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search_ttl_minutes: 30,
            price_ceiling: 200.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions idle for longer than this are reset to offset 0.
    pub retention_days: u32,

    pub reset_cron: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retention_days: 7,
            reset_cron: "0 0 * * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessConfig {
    pub enabled: bool,

    pub staleness_hours: u32,

    /// Upper bound on items checked per run.
    pub batch_size: u32,

    pub cron: String,

    pub run_on_startup: bool,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            staleness_hours: 24,
            batch_size: 60,
            cron: "0 30 */6 * * *".to_string(),
            run_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub poll_interval_ms: u64,

    /// How long a claimed job stays leased before another worker may re-run it.
    pub lease_seconds: u64,

    /// How often the coordinator returns expired leases to `waiting`.
    pub lease_check_interval_ms: u64,

    pub max_attempts: u32,

    pub retry_backoff_seconds: u64,

    pub shutdown_timeout_seconds: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            lease_seconds: 15 * 60,
            lease_check_interval_ms: 30_000,
            max_attempts: 3,
            retry_backoff_seconds: 60,
            shutdown_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(MARKETPLACE_TOKEN_ENV)
            && !token.trim().is_empty()
        {
            self.marketplace.api_token = token.trim().to_string();
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("swipecart").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".swipecart").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.marketplace.upstream_page_size == 0 {
            anyhow::bail!("marketplace.upstream_page_size must be > 0");
        }

        if self.cache.search_ttl_minutes == 0 {
            anyhow::bail!("cache.search_ttl_minutes must be > 0");
        }

        if !(self.cache.price_ceiling > 0.0) {
            anyhow::bail!("cache.price_ceiling must be a positive number");
        }

        if self.freshness.batch_size == 0 {
            anyhow::bail!("freshness.batch_size must be > 0");
        }

        if self.freshness.staleness_hours == 0 {
            anyhow::bail!("freshness.staleness_hours must be > 0");
        }

        if self.freshness.enabled && self.freshness.cron.trim().is_empty() {
            anyhow::bail!("freshness.cron cannot be empty when freshness is enabled");
        }

        if self.sessions.reset_cron.trim().is_empty() {
            anyhow::bail!("sessions.reset_cron cannot be empty");
        }

        if self.queue.lease_seconds == 0 || self.queue.lease_seconds > MAX_QUEUE_SECONDS {
            anyhow::bail!("queue.lease_seconds must be between 1 and {MAX_QUEUE_SECONDS}");
        }

        if self.queue.retry_backoff_seconds > MAX_QUEUE_SECONDS {
            anyhow::bail!("queue.retry_backoff_seconds must be at most {MAX_QUEUE_SECONDS}");
        }

        Ok(())
    }

    #[must_use]
    pub fn search_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache.search_ttl_minutes * 60)
    }

    #[must_use]
    pub fn session_retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.sessions.retention_days))
    }

    #[must_use]
    pub fn staleness_threshold(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.freshness.staleness_hours))
    }

    #[must_use]
    pub fn job_lease(&self) -> chrono::Duration {
        queue_seconds(self.queue.lease_seconds)
    }

    #[must_use]
    pub fn retry_backoff(&self) -> chrono::Duration {
        queue_seconds(self.queue.retry_backoff_seconds)
    }
}

/// One week. Queue timings above this are rejected by `validate`.
const MAX_QUEUE_SECONDS: u64 = 7 * 24 * 60 * 60;

fn queue_seconds(seconds: u64) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(seconds.min(MAX_QUEUE_SECONDS)).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cache.search_ttl_minutes, 30);
        assert_eq!(config.marketplace.upstream_page_size, 200);
        assert_eq!(config.sessions.retention_days, 7);
        assert_eq!(config.freshness.staleness_hours, 24);
        assert_eq!(config.freshness.batch_size, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[cache]"));
        assert!(toml_str.contains("[freshness]"));
        assert!(!toml_str.contains("api_token"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [freshness]
            batch_size = 10
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.freshness.batch_size, 10);

        assert_eq!(config.freshness.staleness_hours, 24);
        assert_eq!(config.cache.price_ceiling, 200.0);
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut config = Config::default();
        config.freshness.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_lease() {
        let mut config = Config::default();
        config.queue.lease_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_queue_durations() {
        let config = Config::default();
        assert_eq!(config.job_lease(), chrono::Duration::minutes(15));
        assert_eq!(config.retry_backoff(), chrono::Duration::seconds(60));
    }

    #[test]
    fn test_validate_rejects_bad_price_ceiling() {
        let mut config = Config::default();
        config.cache.price_ceiling = f64::NAN;
        assert!(config.validate().is_err());
    }
}
