use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;

use luxsync_client::app::DeviceContext;
use luxsync_client::configs::{MemoryStorage, Settings};

pub const USER_ID: &str = "123456";

#[derive(Debug, Clone)]
pub struct RecordedAction {
    pub action: String,
    pub body: Value,
}

#[derive(Default)]
struct MockState {
    actions: Mutex<Vec<RecordedAction>>,
    probes: Mutex<Vec<String>>,
    failing: AtomicBool,
}

/// Stand-in for the vendor webhook API on a random local port.
pub struct MockApi {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockApi {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());

        let router = Router::new()
            .route("/webhook/v1/actions/:action", post(record_action))
            .route("/webhook/:user_id/status", get(record_probe))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    pub fn actions(&self) -> Vec<RecordedAction> {
        self.state.actions.lock().unwrap().clone()
    }

    pub fn probes(&self) -> Vec<String> {
        self.state.probes.lock().unwrap().clone()
    }

    pub fn settings(&self) -> Settings {
        settings_for(&self.base_url(), USER_ID)
    }

    pub async fn context(&self) -> DeviceContext {
        context_with(self.settings()).await
    }
}

async fn record_action(
    State(state): State<Arc<MockState>>,
    Path(action): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, &'static str) {
    state.actions.lock().unwrap().push(RecordedAction { action, body });

    if state.failing.load(Ordering::SeqCst) {
        (StatusCode::INTERNAL_SERVER_ERROR, "device unavailable")
    } else {
        (StatusCode::OK, "ok")
    }
}

async fn record_probe(
    State(state): State<Arc<MockState>>,
    Path(user_id): Path<String>,
) -> StatusCode {
    state.probes.lock().unwrap().push(user_id);
    StatusCode::OK
}

pub fn settings_for(base_url: &str, user_id: &str) -> Settings {
    let mut settings = Settings::from_layers(Some(
        r#"
        [health]
        interval_secs = 1
        timeout_secs = 1

        [timing]
        renotify_delay_ms = 20
        blink_restore_delay_ms = 200
        "#,
    ))
    .unwrap();

    settings.device.base_url = Some(base_url.to_string());
    settings.device.user_id = user_id.to_string();
    settings
}

pub async fn context_with(settings: Settings) -> DeviceContext {
    DeviceContext::new(&Arc::new(settings), Arc::new(MemoryStorage::new())).await
}

/// Port nothing listens on, for unreachable-endpoint cases.
pub async fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    format!("http://{addr}")
}

pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(60)).await;
}
