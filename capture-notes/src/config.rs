use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub storage_backend: StorageBackend,

    // retention
    #[serde(default = "default_cleanup_max_age_days")]
    pub cleanup_max_age_days: u32,
    #[serde(default = "default_true")]
    pub cleanup_on_startup: bool,
    pub cleanup_interval_hours: Option<u64>,

    // media
    #[serde(default = "default_thumbnail_max_width")]
    pub thumbnail_max_width: u32,

    #[serde(default)]
    pub log_json: bool,

    // build
    #[serde(default = "default_local")]
    pub source: String,
    #[serde(default = "default_local")]
    pub git_commit: String,
    #[serde(default = "default_local")]
    pub pipeline_id: String,
    #[serde(default = "default_local")]
    pub version: String,
}

fn default_port() -> u16 {
    4000
}

fn default_database_url() -> String {
    "notes-capture.db".into()
}

fn default_cleanup_max_age_days() -> u32 {
    7
}

fn default_thumbnail_max_width() -> u32 {
    200
}

fn default_true() -> bool {
    true
}

fn default_local() -> String {
    "local".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_url: default_database_url(),
            storage_backend: StorageBackend::default(),
            cleanup_max_age_days: default_cleanup_max_age_days(),
            cleanup_on_startup: true,
            cleanup_interval_hours: None,
            thumbnail_max_width: default_thumbnail_max_width(),
            log_json: false,
            source: default_local(),
            git_commit: default_local(),
            pipeline_id: default_local(),
            version: default_local(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env::<Self>()
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Loads the configuration once. A malformed variable is an error, never a
/// silent fallback to defaults.
pub fn init() -> Result<&'static Config, envy::Error> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }
    let config = Config::from_env()?;
    Ok(CONFIG.get_or_init(|| config))
}

pub fn config() -> &'static Config {
    CONFIG.get_or_init(|| match Config::from_env() {
        Ok(config) => config,
        Err(error) => panic!("invalid configuration: {error}"),
    })
}

#[cfg(test)]
pub fn config_override<F>(override_config: F) -> &'static Config
where
    F: FnOnce(Config) -> Config,
{
    CONFIG.get_or_init(|| override_config(Config::default()))
}
