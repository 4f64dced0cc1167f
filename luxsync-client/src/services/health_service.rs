use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{StatusHub, WebhookClient};
use crate::configs::settings::Health;
use crate::errors::ClientError;

/// Decides the online flag from a probe result and the age of the last
/// successful user action.
///
/// A reachable endpoint always means online. An unreachable one only means
/// offline once no command has succeeded within `grace`, so a transient
/// probe failure does not flip a device that is demonstrably answering
/// commands.
pub fn infer_online(probe_ok: bool, last_action_age: Option<Duration>, grace: Duration) -> bool {
    probe_ok || last_action_age.is_some_and(|age| age < grace)
}

#[derive(Clone)]
pub struct HealthChecker {
    hub: StatusHub,
    client: WebhookClient,
    interval: Duration,
    grace: Duration,
    task: Arc<Mutex<Option<AbortHandle>>>,
}

impl HealthChecker {
    pub fn new(hub: StatusHub, client: WebhookClient, health: &Health) -> Self {
        Self {
            hub,
            client,
            interval: health.interval(),
            grace: health.grace_period(),
            task: Arc::new(Mutex::new(None)),
        }
    }

    /// One reachability request; `false` for transport errors, timeouts
    /// and a missing user id.
    pub async fn probe(&self) -> bool {
        match self.client.probe().await {
            Ok(status) => {
                debug!(%status, "status endpoint reachable");
                true
            }
            Err(ClientError::MissingUserId) => {
                debug!("skipping probe without a user id");
                false
            }
            Err(e) => {
                debug!("status endpoint unreachable: {}", e);
                false
            }
        }
    }

    /// A scheduled check, subject to the grace window.
    pub async fn check(&self) -> bool {
        let probe_ok = self.probe().await;
        let grace = self.grace;

        let status = self
            .hub
            .update(|status| {
                let now = OffsetDateTime::now_utc();
                let age = status
                    .last_action_age(now)
                    .map(|age| Duration::try_from(age).unwrap_or(Duration::ZERO));

                let online = infer_online(probe_ok, age, grace);
                if status.is_online && !online {
                    warn!("device went offline");
                }

                status.is_online = online;
                if probe_ok {
                    status.last_seen = Some(now);
                }
            })
            .await;

        status.is_online
    }

    /// A manual check: the probe result is taken as is.
    pub async fn force_check(&self) -> bool {
        let probe_ok = self.probe().await;

        self.hub
            .update(|status| {
                status.is_online = probe_ok;
                if probe_ok {
                    status.last_seen = Some(OffsetDateTime::now_utc());
                }
            })
            .await;

        probe_ok
    }

    /// Checks immediately and then every interval until [`stop`](Self::stop).
    /// Starting again replaces the running loop.
    pub fn start(&self) -> bool {
        let period = self.interval;
        if period.is_zero() {
            warn!("health check interval must be positive, not starting");
            return false;
        }

        let checker = self.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                checker.check().await;
            }
        })
        .abort_handle();

        let previous = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);

        if let Some(previous) = previous {
            previous.abort();
        }

        info!(interval = ?period, "health check started");
        true
    }

    pub fn stop(&self) -> bool {
        let running = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();

        match running {
            Some(handle) => {
                handle.abort();
                info!("health check stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
