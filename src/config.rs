//! Configuration: optional TOML file plus environment overrides.
//!
//! Every section has defaults, so the service runs with no file at all.
//! Environment variables are applied on top of the file:
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `FILE_SEARCH_DIRS` | `search.dirs`, `;`-separated (falls back to `FILE_SEARCH_DIR`) |
//! | `FILE_LOG_DIR` | `logging.dir` |
//! | `FILE_LOG_LEVEL` | `logging.level` |
//! | `FILE_SEARCH_DEFAULT_LIMIT` | `listing.default_limit` |
//! | `FILE_SEARCH_MAX_LIMIT` | `listing.max_limit` |
//! | `FILE_SEARCH_MAX_SECTIONS` | `search.max_sections_per_file` |
//! | `FILE_SEARCH_CONCURRENCY` | `search.max_concurrency` |
//!
//! When no search directory is configured anywhere, `~/Documents` is used.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::scan::{ScanOptions, DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_SECTIONS};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default)]
    pub dirs: Vec<PathBuf>,
    #[serde(default = "default_max_sections")]
    pub max_sections_per_file: usize,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            max_sections_per_file: DEFAULT_MAX_SECTIONS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            follow_symlinks: false,
        }
    }
}

fn default_max_sections() -> usize {
    DEFAULT_MAX_SECTIONS
}
fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListingConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> usize {
    20
}
fn default_max_limit() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            level: default_log_level(),
        }
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7331".to_string()
}

impl Config {
    /// Scan tunables derived from `[search]`.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            max_concurrency: self.search.max_concurrency,
            max_sections: self.search.max_sections_per_file,
            follow_symlinks: self.search.follow_symlinks,
        }
    }

    /// Apply overrides from `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dirs) = lookup("FILE_SEARCH_DIRS").or_else(|| lookup("FILE_SEARCH_DIR")) {
            self.search.dirs = parse_dir_list(&dirs);
        }
        if let Some(dir) = lookup("FILE_LOG_DIR") {
            self.logging.dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("FILE_LOG_LEVEL") {
            self.logging.level = level.trim().to_lowercase();
        }
        if let Some(v) = lookup("FILE_SEARCH_DEFAULT_LIMIT") {
            self.listing.default_limit = parse_number("FILE_SEARCH_DEFAULT_LIMIT", &v)?;
        }
        if let Some(v) = lookup("FILE_SEARCH_MAX_LIMIT") {
            self.listing.max_limit = parse_number("FILE_SEARCH_MAX_LIMIT", &v)?;
        }
        if let Some(v) = lookup("FILE_SEARCH_MAX_SECTIONS") {
            self.search.max_sections_per_file = parse_number("FILE_SEARCH_MAX_SECTIONS", &v)?;
        }
        if let Some(v) = lookup("FILE_SEARCH_CONCURRENCY") {
            self.search.max_concurrency = parse_number("FILE_SEARCH_CONCURRENCY", &v)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.listing.max_limit == 0 {
            anyhow::bail!("listing.max_limit must be >= 1");
        }
        if self.listing.default_limit == 0 || self.listing.default_limit > self.listing.max_limit {
            anyhow::bail!(
                "listing.default_limit must be between 1 and listing.max_limit ({})",
                self.listing.max_limit
            );
        }
        if self.search.max_sections_per_file == 0 {
            anyhow::bail!("search.max_sections_per_file must be >= 1");
        }
        if self.search.max_concurrency == 0 {
            anyhow::bail!("search.max_concurrency must be >= 1");
        }
        Ok(())
    }
}

fn parse_dir_list(value: &str) -> Vec<PathBuf> {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn parse_number(name: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse::<usize>()
        .with_context(|| format!("{} must be a non-negative integer, got '{}'", name, value))
}

fn default_search_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
}

/// Load configuration from the process environment and an optional TOML file.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    load_config_with(path, |name| std::env::var(name).ok())
}

/// Like [`load_config`], with an explicit environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str::<Config>(&content).with_context(|| "Failed to parse config file")?
        }
        None => Config::default(),
    };

    config.apply_env(lookup)?;
    if config.search.dirs.is_empty() {
        config.search.dirs = vec![default_search_dir()];
    }
    config.validate()?;
    Ok(config)
}
