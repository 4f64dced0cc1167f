use std::time::Duration;

use luxsync_api::{ActionEndpoint, ActionFields, ActionRequest, Color};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::configs::settings::Device;
use crate::errors::{ClientError, Result};

/// Thin client for the Luxafor webhook API.
#[derive(Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
    base_url: String,
    user_id: Option<String>,
}

impl WebhookClient {
    pub fn new(device: &Device, timeout: Duration) -> Self {
        let http = match reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
        {
            Ok(http) => http,
            Err(e) => {
                warn!("Falling back to an HTTP client without timeouts: {}", e);
                reqwest::Client::new()
            }
        };

        Self {
            http,
            base_url: device.base_url().to_string(),
            user_id: device.user_id().map(str::to_string),
        }
    }

    pub fn user_id(&self) -> Result<&str> {
        self.user_id.as_deref().ok_or(ClientError::MissingUserId)
    }

    pub fn action_url(&self, endpoint: ActionEndpoint) -> String {
        format!("{}/webhook/v1/actions/{}", self.base_url, endpoint.path())
    }

    pub fn status_url(&self, user_id: &str) -> String {
        format!("{}/webhook/{}/status", self.base_url, user_id)
    }

    pub async fn send_action(&self, endpoint: ActionEndpoint, color: &Color) -> Result<()> {
        let request = ActionRequest {
            user_id: self.user_id()?.to_string(),
            action_fields: ActionFields::for_color(color)?,
        };

        let response = self
            .http
            .post(self.action_url(endpoint))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(endpoint = endpoint.path(), %color, "webhook action accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Api { status, body })
    }

    /// Reachability only: any HTTP answer counts, the body is ignored.
    pub async fn probe(&self) -> Result<StatusCode> {
        let user_id = self.user_id()?;
        let response = self.http.get(self.status_url(user_id)).send().await?;

        Ok(response.status())
    }
}
