use std::time::Duration;

use luxsync_api::{ActionEndpoint, Color, CommandPhase};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{StatusHub, WebhookClient};
use crate::errors::ClientError;

/// Result of one user command. Errors never cross this boundary as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl CommandOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Intent {
    Solid(Color),
    Off,
    Blink(Color),
    Test,
}

impl Intent {
    fn describe(&self) -> String {
        match self {
            Intent::Solid(color) => format!("Set color to {color}"),
            Intent::Off => String::from("Turned off"),
            Intent::Blink(color) => format!("Blink {color}"),
            Intent::Test => String::from("Connection test"),
        }
    }

    fn request(&self) -> (ActionEndpoint, Color) {
        match self {
            Intent::Solid(color) => (ActionEndpoint::SolidColor, color.clone()),
            Intent::Off => (ActionEndpoint::SolidColor, Color::Off),
            Intent::Blink(color) => (ActionEndpoint::Blink, color.clone()),
            Intent::Test => (ActionEndpoint::Blink, Color::White),
        }
    }

    /// Color the status shows while the command is in flight.
    fn tentative_color(&self) -> Option<Color> {
        match self {
            Intent::Solid(color) | Intent::Blink(color) => Some(color.clone()),
            Intent::Off => Some(Color::Off),
            Intent::Test => None,
        }
    }
}

/// Turns user intents into webhook calls, updating the shared status
/// optimistically first and confirming or rolling back afterwards.
#[derive(Clone)]
pub struct CommandIssuer {
    hub: StatusHub,
    client: WebhookClient,
    restore_delay: Duration,
}

impl CommandIssuer {
    pub fn new(hub: StatusHub, client: WebhookClient, restore_delay: Duration) -> Self {
        Self {
            hub,
            client,
            restore_delay,
        }
    }

    pub async fn set_solid_color(&self, color: Color) -> CommandOutcome {
        self.execute(Intent::Solid(color)).await
    }

    pub async fn turn_off(&self) -> CommandOutcome {
        self.execute(Intent::Off).await
    }

    /// The device blinks and returns to its previous color on its own; the
    /// status mirrors that by restoring the prior color after a delay.
    pub async fn blink(&self, color: Color) -> CommandOutcome {
        self.execute(Intent::Blink(color)).await
    }

    pub async fn test_connection(&self) -> CommandOutcome {
        self.execute(Intent::Test).await
    }

    async fn execute(&self, intent: Intent) -> CommandOutcome {
        let command_id = Uuid::new_v4();
        let action = intent.describe();

        if let Err(e) = self.client.user_id() {
            warn!(%command_id, "{} rejected: {}", action, e);
            return CommandOutcome::failed(e);
        }

        if intent.tentative_color() == Some(Color::Unknown) {
            return CommandOutcome::failed(ClientError::UnsupportedColor(Color::Unknown));
        }

        let (revision, prior) = match intent.tentative_color() {
            Some(color) => {
                let selected = matches!(intent, Intent::Solid(_)).then(|| color.clone());
                let transition = self
                    .hub
                    .begin(|status| {
                        status.current_color = color;
                        status.last_action = action.clone();
                        status.phase = CommandPhase::Pending;
                        if let Some(selected) = selected {
                            status.selected_color = Some(selected);
                        }
                    })
                    .await;

                // chained blinks return to the color the first one restores
                let prior = transition
                    .cancelled_restore
                    .unwrap_or(transition.previous.current_color);

                if matches!(intent, Intent::Blink(_)) && prior != Color::Unknown {
                    self.hub
                        .schedule_restore(transition.revision, prior.clone(), self.restore_delay)
                        .await;
                }

                (transition.revision, Some(prior))
            }
            None => {
                self.hub
                    .update(|status| {
                        status.last_action = action.clone();
                        status.phase = CommandPhase::Pending;
                    })
                    .await;

                (self.hub.revision().await, None)
            }
        };

        let (endpoint, color) = intent.request();
        match self.client.send_action(endpoint, &color).await {
            Ok(()) => {
                let now = OffsetDateTime::now_utc();
                self.hub
                    .settle(revision, |status, superseded| {
                        status.is_online = true;
                        status.last_seen = Some(now);
                        status.last_action_at = Some(now);
                        if !superseded {
                            status.phase = CommandPhase::Confirmed;
                        }
                    })
                    .await;

                info!(%command_id, "{} confirmed", action);
                CommandOutcome::succeeded()
            }
            Err(e) => {
                if matches!(intent, Intent::Blink(_)) {
                    self.hub.cancel_restore_from(revision);
                }

                self.hub
                    .settle(revision, |status, superseded| {
                        if superseded {
                            return;
                        }
                        status.phase = CommandPhase::Failed;
                        status.last_action = format!("{action} (failed)");
                        if let Some(prior) = prior {
                            status.current_color = prior;
                        }
                    })
                    .await;

                warn!(%command_id, "{} failed: {}", action, e);
                CommandOutcome::failed(e)
            }
        }
    }
}
