use std::sync::Arc;

use luxsync_api::{Color, PersistedStatus, STATUS_STORAGE_KEY};
use luxsync_client::app::DeviceContext;
use luxsync_client::configs::{FileStorage, LocalStorage};
use time::OffsetDateTime;

use crate::common::mock_api::MockApi;

mod common;

#[tokio::test]
async fn test_status_survives_restart() {
    let api = MockApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    let settings = Arc::new(api.settings());

    let context = DeviceContext::new(&settings, Arc::new(FileStorage::new(path.clone()))).await;
    context.commands.set_solid_color(Color::Magenta).await;
    drop(context);

    let reopened = DeviceContext::new(&settings, Arc::new(FileStorage::new(path))).await;
    let status = reopened.hub.status().await;
    assert_eq!(status.current_color, Color::Magenta);
    assert_eq!(status.selected_color, Some(Color::Magenta));
    assert_eq!(status.last_action, "Set color to magenta");
    assert!(status.is_online);
}

#[tokio::test]
async fn test_stale_record_keeps_colors_only() {
    let api = MockApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path().join("storage.json")));

    let record = PersistedStatus {
        is_online: true,
        current_color: Color::Blue,
        last_seen: Some(OffsetDateTime::now_utc() - time::Duration::hours(1)),
        last_action: String::from("Set color to blue"),
        selected_color: Some(Color::Blue),
        last_updated: OffsetDateTime::now_utc() - time::Duration::hours(1),
        last_action_at: None,
    };
    storage
        .set_item(STATUS_STORAGE_KEY, &serde_json::to_string(&record).unwrap())
        .await
        .unwrap();

    let context = DeviceContext::new(&Arc::new(api.settings()), storage).await;
    let status = context.hub.status().await;
    assert_eq!(status.current_color, Color::Blue);
    assert_eq!(status.selected_color, Some(Color::Blue));
    assert!(!status.is_online);
    assert!(status.last_action.is_empty());
}

#[tokio::test]
async fn test_corrupted_storage_starts_fresh() {
    let api = MockApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    std::fs::write(&path, "{ not json").unwrap();

    let context = DeviceContext::new(&Arc::new(api.settings()), Arc::new(FileStorage::new(path.clone()))).await;
    assert_eq!(context.hub.current_color().await, Color::Unknown);

    // the next write replaces the broken file
    assert!(context.commands.set_solid_color(Color::Green).await.success);
    let raw = std::fs::read_to_string(path).unwrap();
    assert!(raw.contains(STATUS_STORAGE_KEY));
}

#[tokio::test]
async fn test_reset_clears_storage() {
    let api = MockApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path().join("storage.json")));

    let context = DeviceContext::new(&Arc::new(api.settings()), storage.clone()).await;
    context.commands.set_solid_color(Color::Red).await;
    assert!(storage.get_item(STATUS_STORAGE_KEY).await.unwrap().is_some());

    context.hub.reset().await;
    assert_eq!(storage.get_item(STATUS_STORAGE_KEY).await.unwrap(), None);
    assert_eq!(context.hub.current_color().await, Color::Unknown);
}

#[tokio::test]
async fn test_partly_corrupted_record_keeps_color() {
    let api = MockApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path().join("storage.json")));

    let raw = serde_json::json!({
        "isOnline": true,
        "currentColor": "red",
        "lastSeen": "garbage",
        "lastAction": "Set color to red",
        "lastUpdated": "not a date",
    });
    storage
        .set_item(STATUS_STORAGE_KEY, &raw.to_string())
        .await
        .unwrap();

    let context = DeviceContext::new(&Arc::new(api.settings()), storage).await;
    assert_eq!(context.hub.current_color().await, Color::Red);
}
