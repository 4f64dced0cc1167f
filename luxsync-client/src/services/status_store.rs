use std::sync::Arc;

use luxsync_api::{CACHE_DURATION, DeviceStatus, PersistedStatus, STATUS_STORAGE_KEY};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, warn};

use crate::configs::LocalStorage;
use crate::errors::StorageError;

/// Cache of the last known device status. Never a source of truth: reads
/// fall back to defaults and write failures are only logged.
pub struct StatusStore {
    storage: Arc<dyn LocalStorage>,
    cache_duration: time::Duration,
}

impl StatusStore {
    pub fn new(storage: Arc<dyn LocalStorage>, cache_duration: std::time::Duration) -> Self {
        Self {
            storage,
            cache_duration: time::Duration::try_from(cache_duration).unwrap_or(CACHE_DURATION),
        }
    }

    pub async fn load(&self) -> DeviceStatus {
        self.load_at(OffsetDateTime::now_utc()).await
    }

    pub async fn load_at(&self, now: OffsetDateTime) -> DeviceStatus {
        match self.read().await {
            Ok(Some(record)) => {
                let fresh = record.is_fresh(now, self.cache_duration);
                debug!(fresh, color = %record.current_color, "restored device status");
                record.restore(now, self.cache_duration)
            }
            Ok(None) => DeviceStatus::default(),
            Err(e) => {
                warn!("Ignoring unreadable device status: {}", e);
                DeviceStatus::default()
            }
        }
    }

    pub async fn save(&self, status: &DeviceStatus) {
        self.save_at(status, OffsetDateTime::now_utc()).await
    }

    pub async fn save_at(&self, status: &DeviceStatus, now: OffsetDateTime) {
        if let Err(e) = self.write(&PersistedStatus::capture(status, now)).await {
            warn!("Failed to persist device status: {}", e);
        }
    }

    pub async fn clear(&self) {
        if let Err(e) = self.storage.remove_item(STATUS_STORAGE_KEY).await {
            warn!("Failed to clear device status: {}", e);
        }
    }

    async fn read(&self) -> Result<Option<PersistedStatus>, StorageError> {
        match self.storage.get_item(STATUS_STORAGE_KEY).await? {
            Some(raw) => Ok(Some(decode(&raw)?)),
            None => Ok(None),
        }
    }

    async fn write(&self, record: &PersistedStatus) -> Result<(), StorageError> {
        let raw = serde_json::to_string(record)?;
        self.storage.set_item(STATUS_STORAGE_KEY, &raw).await
    }
}

/// Decodes a record field by field. A field that is missing or malformed
/// falls back to its default instead of discarding the whole record, and a
/// record without a readable `lastUpdated` counts as stale.
fn decode(raw: &str) -> Result<PersistedStatus, serde_json::Error> {
    let mut record: Map<String, Value> = serde_json::from_str(raw)?;
    let mut malformed = Vec::new();

    let mut take = |key: &'static str| record.remove(key).filter(|value| !value.is_null());

    let status = PersistedStatus {
        is_online: parse(take("isOnline"), "isOnline", &mut malformed).unwrap_or_default(),
        current_color: parse(take("currentColor"), "currentColor", &mut malformed)
            .unwrap_or_default(),
        last_seen: timestamp(take("lastSeen"), "lastSeen", &mut malformed),
        last_action: parse(take("lastAction"), "lastAction", &mut malformed).unwrap_or_default(),
        selected_color: parse(take("selectedColor"), "selectedColor", &mut malformed),
        last_updated: timestamp(take("lastUpdated"), "lastUpdated", &mut malformed)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH),
        last_action_at: timestamp(take("lastActionAt"), "lastActionAt", &mut malformed),
    };

    if !malformed.is_empty() {
        warn!(fields = ?malformed, "Ignoring malformed device status fields");
    }

    Ok(status)
}

fn parse<T: DeserializeOwned>(
    value: Option<Value>,
    key: &'static str,
    malformed: &mut Vec<&'static str>,
) -> Option<T> {
    let value = value?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            malformed.push(key);
            None
        }
    }
}

fn timestamp(
    value: Option<Value>,
    key: &'static str,
    malformed: &mut Vec<&'static str>,
) -> Option<OffsetDateTime> {
    let text: String = parse(value, key, malformed)?;
    match OffsetDateTime::parse(&text, &Rfc3339) {
        Ok(at) => Some(at),
        Err(_) => {
            malformed.push(key);
            None
        }
    }
}
