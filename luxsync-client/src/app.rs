use std::sync::Arc;

use tracing::warn;

use crate::configs::{FileStorage, LocalStorage, MemoryStorage, Settings};
use crate::services::{CommandIssuer, HealthChecker, StatusHub, StatusStore, WebhookClient};

/// Everything a surface needs to show and drive the device. Cloning shares
/// the same underlying status.
#[derive(Clone)]
pub struct DeviceContext {
    pub settings: Arc<Settings>,
    pub hub: StatusHub,
    pub commands: CommandIssuer,
    pub health: HealthChecker,
}

impl DeviceContext {
    pub async fn new(settings: &Arc<Settings>, storage: Arc<dyn LocalStorage>) -> Self {
        let store = StatusStore::new(storage, settings.storage.cache_duration());
        let hub = StatusHub::hydrate(store, settings.timing.renotify_delay()).await;
        let client = WebhookClient::new(&settings.device, settings.health.timeout());

        let commands = CommandIssuer::new(
            hub.clone(),
            client.clone(),
            settings.timing.blink_restore_delay(),
        );
        let health = HealthChecker::new(hub.clone(), client, &settings.health);

        Self {
            settings: settings.clone(),
            hub,
            commands,
            health,
        }
    }

    /// Uses the configured storage file, or memory when no file location
    /// can be resolved.
    pub async fn from_settings(settings: &Arc<Settings>) -> Self {
        let storage: Arc<dyn LocalStorage> = match settings.storage.resolve_path() {
            Ok(path) => Arc::new(FileStorage::new(path)),
            Err(e) => {
                warn!("No storage location ({}), status will not be kept", e);
                Arc::new(MemoryStorage::new())
            }
        };

        Self::new(settings, storage).await
    }
}
