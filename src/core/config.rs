//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.geonav/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::state::DEFAULT_CITY;
use crate::core::transform::Frame;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeonavConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SearchConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub city: Option<String>,
    pub city_limit: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MapConfig {
    /// Frame that layer and table geometry is expressed in.
    pub geometry_frame: Option<Frame>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct HistoryConfig {
    pub persist: Option<bool>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_SEARCH_BASE_URL: &str = "http://localhost:8080/api/map";
pub const CONFIG_DIR: &str = ".geonav";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub search_base_url: String,
    pub search_api_key: Option<String>,
    pub city: String,
    pub city_limit: bool,
    pub geometry_frame: Frame,
    pub persist_history: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        resolve_with(&GeonavConfig::default(), &CliOverrides::default(), |_| None)
    }
}

/// Values given on the command line. `None` means the flag was not passed.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub search_url: Option<String>,
    pub city: Option<String>,
    pub no_persist: bool,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns `~/.geonav`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_DIR))
}

/// Returns the path to `~/.geonav/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load config from `~/.geonav/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `GeonavConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<GeonavConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(GeonavConfig::default());
        }
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<GeonavConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(GeonavConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: GeonavConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

const DEFAULT_CONFIG_CONTENT: &str = r#"# geonav configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [search]
# base_url = "http://localhost:8080/api/map"   # Or set GEONAV_SEARCH_URL
# api_key = "..."                               # Or set GEONAV_SEARCH_API_KEY
# city = "丽水"                                 # Or set GEONAV_CITY
# city_limit = true

# [map]
# geometry_frame = "wgs84"                      # "wgs84" or "gcj02"

# [history]
# persist = true
"#;

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, DEFAULT_CONFIG_CONTENT) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &GeonavConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with(config, cli, |key| std::env::var(key).ok())
}

/// Like [`resolve`], reading environment variables through `env`.
pub fn resolve_with(
    config: &GeonavConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    // Search URL: CLI → env → config → default
    let search_base_url = cli
        .search_url
        .clone()
        .or_else(|| env("GEONAV_SEARCH_URL"))
        .or_else(|| config.search.base_url.clone())
        .unwrap_or_else(|| DEFAULT_SEARCH_BASE_URL.to_string());

    // API key: env → config
    let search_api_key = env("GEONAV_SEARCH_API_KEY")
        .or_else(|| config.search.api_key.clone())
        .filter(|k| !k.trim().is_empty());

    // City: CLI → env → config → default
    let city = cli
        .city
        .clone()
        .or_else(|| env("GEONAV_CITY"))
        .or_else(|| config.search.city.clone())
        .unwrap_or_else(|| DEFAULT_CITY.to_string());

    ResolvedConfig {
        search_base_url,
        search_api_key,
        city,
        city_limit: config.search.city_limit.unwrap_or(true),
        geometry_frame: config.map.geometry_frame.unwrap_or_default(),
        persist_history: !cli.no_persist && config.history.persist.unwrap_or(true),
    }
}
