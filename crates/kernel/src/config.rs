//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cache::DEFAULT_CAPACITY;
use crate::menu::DEFAULT_REBUILD_LIMIT;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the menu settings file (YAML, or JSON by extension).
    pub settings_path: Option<PathBuf>,

    /// Maximum rebuild passes per request before failing (default: 10).
    pub rebuild_limit: usize,

    /// How long concurrent callers wait for menu discovery (default: 10s).
    pub discovery_timeout: Duration,

    /// Maximum number of cached trees (default: 10000).
    pub cache_capacity: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_path: None,
            rebuild_limit: DEFAULT_REBUILD_LIMIT,
            discovery_timeout: Duration::from_secs(10),
            cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let settings_path = env::var("MENUS_SETTINGS").ok().map(PathBuf::from);

        let rebuild_limit = env::var("MENUS_REBUILD_LIMIT")
            .unwrap_or_else(|_| DEFAULT_REBUILD_LIMIT.to_string())
            .parse()
            .context("MENUS_REBUILD_LIMIT must be a valid usize")?;
        if rebuild_limit == 0 {
            anyhow::bail!("MENUS_REBUILD_LIMIT must be at least 1");
        }

        let discovery_timeout_secs: u64 = env::var("MENUS_DISCOVERY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("MENUS_DISCOVERY_TIMEOUT_SECS must be a valid u64")?;

        let cache_capacity = env::var("MENUS_CACHE_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_CAPACITY.to_string())
            .parse()
            .context("MENUS_CACHE_CAPACITY must be a valid u64")?;

        Ok(Self {
            settings_path,
            rebuild_limit,
            discovery_timeout: Duration::from_secs(discovery_timeout_secs),
            cache_capacity,
        })
    }
}
