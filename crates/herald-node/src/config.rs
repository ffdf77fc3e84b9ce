//! # Node Configuration
//!
//! The gateway configuration plus the file locations the node wires into
//! its adapters.

use anyhow::{Context, Result};
use hd_02_admin_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Gateway, rate limit, access, dispatch and media settings.
    pub gateway: GatewayConfig,
    /// Adapter file locations.
    pub storage: StorageConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory snapshot JSON. Without it the node starts with an empty directory.
    pub directory_file: Option<PathBuf>,
    /// Append-only broadcast history.
    pub history_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory_file: None,
            history_file: PathBuf::from("./data/broadcast-history.jsonl"),
        }
    }
}

/// Load configuration: defaults, then the `HERALD_CONFIG` JSON file, then
/// environment overrides.
pub fn load_config() -> Result<NodeConfig> {
    load_config_from(|key| std::env::var(key).ok())
}

/// [`load_config`] over an arbitrary key lookup.
pub fn load_config_from<F>(lookup: F) -> Result<NodeConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match lookup("HERALD_CONFIG") {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing config file {path}"))?
        }
        None => NodeConfig::default(),
    };

    config
        .gateway
        .apply_overrides(&lookup)
        .context("applying HERALD_* overrides")?;

    if let Some(path) = lookup("HERALD_DIRECTORY_FILE") {
        config.storage.directory_file = Some(PathBuf::from(path));
    }
    if let Some(path) = lookup("HERALD_HISTORY_FILE") {
        config.storage.history_file = PathBuf::from(path);
    }

    Ok(config)
}
