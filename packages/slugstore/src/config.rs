use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::entity::slug::MAX_SLUG_LENGTH;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Pool ceiling. Default: 10.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connections kept open while idle. Default: 1.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connect and acquire timeout in seconds. Default: 8.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Log every statement through sqlx. Default: false.
    #[serde(default)]
    pub sqlx_logging: bool,
}

fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}
fn default_timeout_secs() -> u64 {
    8
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            timeout_secs: default_timeout_secs(),
            sqlx_logging: false,
        }
    }
}

/// Read-through cache settings for derived slug values.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Whether current slug/path lookups are memoized. Default: true.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
}

fn default_cache_enabled() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
        }
    }
}

/// Defaults applied to every owner type unless its `SluggedConfig` overrides them.
#[derive(Debug, Deserialize, Clone)]
pub struct SlugSettings {
    /// Longest slug, in characters. Default: 126 (the column width).
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Placed between the slug text and the owner id in last-resort slugs. Default: ";".
    #[serde(default = "default_id_separator")]
    pub id_separator: String,
    /// Slugs that may never be assigned. Default: new, edit, delete.
    #[serde(default = "default_blacklist")]
    pub blacklist: Vec<String>,
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_max_length() -> usize {
    MAX_SLUG_LENGTH
}
fn default_id_separator() -> String {
    ";".into()
}
fn default_blacklist() -> Vec<String> {
    vec!["new".into(), "edit".into(), "delete".into()]
}

impl Default for SlugSettings {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            id_separator: default_id_separator(),
            blacklist: default_blacklist(),
            cache: CacheConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub slugs: SlugSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("database.url", "postgres://localhost/slugstore")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., SLUGSTORE__DATABASE__URL)
            .add_source(Environment::with_prefix("SLUGSTORE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
