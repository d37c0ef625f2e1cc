//! Configuration Loader
//!
//! Loads and validates scheduler configuration from TOML files. Every knob
//! the scheduler and classifier consume lives here; nothing reads mutable
//! process-wide state.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::domain::classifier::{ClassifierConfig, TierBound};
use crate::domain::pair::Tier;
use crate::domain::world::{ServerInfo, ServerRegistry};

/// Main configuration structure matching config.toml.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scheduler: SchedulerSection,
    pub classifier: ClassifierSection,
    pub api: ApiSection,
    #[serde(default)]
    pub manual: ManualSection,
    #[serde(default)]
    pub logging: LoggingSection,
    /// Tracked game servers with their data centers.
    #[serde(default)]
    pub worlds: Vec<WorldEntry>,
}

/// Update-run settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Wall-clock budget of one cron-triggered run, in seconds.
    pub cron_deadline_secs: u64,
    /// Maximum pairs pulled per run.
    pub max_batch_size: usize,
    /// Minutes of each hour during which runs abort immediately; the
    /// upstream service restarts inside this window.
    #[serde(default = "default_blackout_minutes")]
    pub blackout_minutes: Vec<u32>,
    /// Critical-exception count that opens the circuit breaker.
    #[serde(default = "default_error_threshold")]
    pub error_threshold: u32,
}

/// Priority classification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierSection {
    /// Histories shorter than this park the pair in the never-sold state.
    pub minimum_sales: usize,
    /// Cap on consecutive-sale deltas measured per pair.
    #[serde(default = "default_max_deltas")]
    pub max_deltas: usize,
    /// Ascending (max_interval_secs, tier) rows.
    pub tier_bounds: Vec<TierBoundEntry>,
    /// Fallback when the average interval clears every bound.
    pub default_tier: Tier,
    /// Tier paired with the never-sold state.
    pub never_sold_tier: Tier,
    /// Reserved tier for freshly tracked items.
    pub new_item_tier: Tier,
    /// Tier consumers assume on a priority-cache miss.
    pub cache_default_tier: Tier,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TierBoundEntry {
    pub max_interval_secs: u64,
    pub tier: Tier,
}

/// Market API client settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    /// Base URL of the market API.
    pub base_url: String,
    /// Per-request client timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Bounded retry/poll attempts per call.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Delay between attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl ApiSection {
    /// Base URL with environment-variable override.
    pub fn resolved_base_url(&self) -> String {
        std::env::var("TRADEPOST_API_URL").unwrap_or_else(|_| self.base_url.clone())
    }
}

/// Manual/patreon update request settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualSection {
    /// Per-item-per-server cooldown between manual requests, in seconds.
    pub cooldown_secs: u64,
}

impl Default for ManualSection {
    fn default() -> Self {
        Self { cooldown_secs: 300 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorldEntry {
    pub id: u32,
    pub name: String,
    pub data_center: String,
}

fn default_blackout_minutes() -> Vec<u32> {
    vec![7, 8]
}

fn default_error_threshold() -> u32 {
    crate::domain::circuit_breaker::DEFAULT_ERROR_THRESHOLD
}

fn default_max_deltas() -> usize {
    100
}

fn default_timeout_ms() -> u64 {
    2_500
}

fn default_retry_attempts() -> u32 {
    6
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let expanded = shellexpand::tilde(&path.as_ref().to_string_lossy()).to_string();
    let content = std::fs::read_to_string(expanded)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.max_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler.max_batch_size must be > 0".to_string(),
            ));
        }

        if self.scheduler.error_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler.error_threshold must be > 0".to_string(),
            ));
        }

        if let Some(minute) = self.scheduler.blackout_minutes.iter().find(|m| **m > 59) {
            return Err(ConfigError::ValidationError(format!(
                "scheduler.blackout_minutes entries must be 0-59, got {}",
                minute
            )));
        }

        if self.classifier.minimum_sales < 2 {
            return Err(ConfigError::ValidationError(format!(
                "classifier.minimum_sales must be >= 2 (one anchor plus one delta), got {}",
                self.classifier.minimum_sales
            )));
        }

        if self.classifier.max_deltas == 0 {
            return Err(ConfigError::ValidationError(
                "classifier.max_deltas must be > 0".to_string(),
            ));
        }

        if self.classifier.tier_bounds.is_empty() {
            return Err(ConfigError::ValidationError(
                "classifier.tier_bounds must not be empty".to_string(),
            ));
        }

        for pair in self.classifier.tier_bounds.windows(2) {
            if pair[0].max_interval_secs >= pair[1].max_interval_secs {
                return Err(ConfigError::ValidationError(format!(
                    "classifier.tier_bounds must be strictly ascending, got {} before {}",
                    pair[0].max_interval_secs, pair[1].max_interval_secs
                )));
            }
        }

        if self.api.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "api.base_url must not be empty".to_string(),
            ));
        }

        if self.api.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "api.timeout_ms must be > 0".to_string(),
            ));
        }

        if self.api.retry_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "api.retry_attempts must be > 0".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for world in &self.worlds {
            if !seen.insert(world.id) {
                return Err(ConfigError::ValidationError(format!(
                    "worlds contains duplicate server id {}",
                    world.id
                )));
            }
        }

        Ok(())
    }

    /// Domain-level classifier settings.
    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            minimum_sales: self.classifier.minimum_sales,
            max_deltas: self.classifier.max_deltas,
            tier_bounds: self
                .classifier
                .tier_bounds
                .iter()
                .map(|b| TierBound {
                    max_interval_secs: b.max_interval_secs,
                    tier: b.tier,
                })
                .collect(),
            default_tier: self.classifier.default_tier,
            never_sold_tier: self.classifier.never_sold_tier,
        }
    }

    /// Server registry built from the worlds table.
    pub fn server_registry(&self) -> ServerRegistry {
        ServerRegistry::new(
            self.worlds
                .iter()
                .map(|w| ServerInfo {
                    id: w.id,
                    name: w.name.clone(),
                    data_center: w.data_center.clone(),
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID: &str = r#"
        [scheduler]
        cron_deadline_secs = 55
        max_batch_size = 300

        [classifier]
        minimum_sales = 5
        tier_bounds = [
            { max_interval_secs = 3600, tier = 1 },
            { max_interval_secs = 86400, tier = 2 },
            { max_interval_secs = 259200, tier = 3 },
        ]
        default_tier = 8
        never_sold_tier = 10
        new_item_tier = 9
        cache_default_tier = 8

        [api]
        base_url = "https://market.example.com"

        [[worlds]]
        id = 1
        name = "Cerberus"
        data_center = "Chaos"

        [[worlds]]
        id = 2
        name = "Ragnarok"
        data_center = "Chaos"
    "#;

    fn parse(toml_str: &str) -> Config {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn valid_config_parses_with_defaults() {
        let config = parse(VALID);
        config.validate().unwrap();

        assert_eq!(config.scheduler.blackout_minutes, vec![7, 8]);
        assert_eq!(config.classifier.max_deltas, 100);
        assert_eq!(config.api.timeout_ms, 2_500);
        assert_eq!(config.api.retry_attempts, 6);
        assert_eq!(config.manual.cooldown_secs, 300);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn load_config_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VALID.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.scheduler.max_batch_size, 300);
    }

    #[test]
    fn unordered_tier_bounds_are_rejected() {
        let mut config = parse(VALID);
        config.classifier.tier_bounds.swap(0, 2);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("strictly ascending"));
    }

    #[test]
    fn empty_tier_table_is_rejected() {
        let mut config = parse(VALID);
        config.classifier.tier_bounds.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut config = parse(VALID);
        config.scheduler.max_batch_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_batch_size"));
    }

    #[test]
    fn minimum_sales_below_two_is_rejected() {
        let mut config = parse(VALID);
        config.classifier.minimum_sales = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_blackout_minute_is_rejected() {
        let mut config = parse(VALID);
        config.scheduler.blackout_minutes = vec![7, 61];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("blackout_minutes"));
    }

    #[test]
    fn duplicate_world_id_is_rejected() {
        let mut config = parse(VALID);
        config.worlds.push(WorldEntry {
            id: 1,
            name: "Shiva".to_string(),
            data_center: "Light".to_string(),
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate server id"));
    }

    #[test]
    fn classifier_config_conversion() {
        let config = parse(VALID);
        let classifier = config.classifier_config();
        assert_eq!(classifier.tier_bounds.len(), 3);
        assert_eq!(classifier.tier_bounds[0].tier, 1);
        assert_eq!(classifier.default_tier, 8);
    }

    #[test]
    fn server_registry_conversion() {
        let config = parse(VALID);
        let registry = config.server_registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.data_center_servers(1), vec![1, 2]);
    }
}
