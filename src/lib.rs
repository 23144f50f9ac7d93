pub mod broadcast;
pub mod channel;
pub mod config;
pub mod generator;
pub mod inbox;
pub mod registry;
pub mod rest;
pub mod storage;
pub mod sync;

use std::sync::Arc;

use anyhow::Result;
use broadcast::Broadcaster;
use config::DaemonConfig;
use inbox::InboxService;
use registry::SubscriptionRegistry;
use storage::Storage;

/// Shared application state passed to every route handler and the channel
/// server.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<DaemonConfig>,
    pub storage: Arc<Storage>,
    /// Live-connection subscriptions; rebuilt empty on restart.
    pub registry: Arc<SubscriptionRegistry>,
    pub broadcaster: Arc<Broadcaster>,
    pub inbox: Arc<InboxService>,
    pub started_at: std::time::Instant,
}

impl AppContext {
    /// Open storage and wire the registry, broadcaster, and inbox service
    /// together.
    pub async fn new(config: DaemonConfig) -> Result<Self> {
        let config = Arc::new(config);
        let storage = Arc::new(Storage::new(&config.data_dir).await?);
        let registry = Arc::new(SubscriptionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(registry.clone()));
        let inbox = Arc::new(InboxService::new(storage.clone(), broadcaster.clone()));

        Ok(Self {
            config,
            storage,
            registry,
            broadcaster,
            inbox,
            started_at: std::time::Instant::now(),
        })
    }
}
