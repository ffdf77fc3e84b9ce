//! Adapter and service wiring.

use crate::config::NodeConfig;
use anyhow::{Context, Result};
use hd_01_broadcast_dispatch::{
    BroadcastApi, DirectoryProvider, DispatchEngine, InMemoryDirectory, JsonFileDirectory,
    JsonlHistoryStore, MessageSender,
};
use hd_02_admin_gateway::AdminGatewayService;
use shared_types::Directory;
use std::sync::Arc;
use tracing::{info, warn};

/// Build the admin gateway over a dispatch engine using `sender` for delivery.
pub fn build_gateway<S>(config: &NodeConfig, sender: Arc<S>) -> Result<AdminGatewayService>
where
    S: MessageSender + 'static,
{
    let history_file = &config.storage.history_file;
    if let Some(parent) = history_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating history directory {}", parent.display()))?;
    }
    let history = Arc::new(JsonlHistoryStore::new(history_file.clone()));
    info!(path = %history_file.display(), "Broadcast history log");

    let api = match &config.storage.directory_file {
        Some(path) => {
            info!(path = %path.display(), "Directory snapshot file");
            engine(config, Arc::new(JsonFileDirectory::new(path.clone())), sender, history)
        }
        None => {
            warn!("No directory file configured; every dispatch will find no targets");
            engine(
                config,
                Arc::new(InMemoryDirectory::new(Directory::default())),
                sender,
                history,
            )
        }
    };

    AdminGatewayService::new(config.gateway.clone(), api).context("building admin gateway")
}

fn engine<D, S>(
    config: &NodeConfig,
    directory: Arc<D>,
    sender: Arc<S>,
    history: Arc<JsonlHistoryStore>,
) -> Arc<dyn BroadcastApi>
where
    D: DirectoryProvider + 'static,
    S: MessageSender + 'static,
{
    Arc::new(
        DispatchEngine::new(directory, sender, history)
            .with_config(config.gateway.dispatch.clone())
            .with_media_limits(config.gateway.media),
    )
}
