use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::Color;

/// Storage key the status record lives under.
pub const STATUS_STORAGE_KEY: &str = "luxafor-status";

/// How long a persisted record stays authoritative.
pub const CACHE_DURATION: Duration = Duration::minutes(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandPhase {
    /// No command issued in this session
    #[default]
    Idle,
    /// Applied locally, waiting for the vendor API
    Pending,
    /// Accepted by the vendor API
    Confirmed,
    /// Rejected or unreachable, local change rolled back where possible
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceStatus {
    /// Last known reachability
    pub is_online: bool,
    /// Last commanded or observed color
    pub current_color: Color,
    /// Last time the device state was confirmed
    pub last_seen: Option<OffsetDateTime>,
    /// Human-readable description of the last user command
    pub last_action: String,
    /// Color last picked by the user
    pub selected_color: Option<Color>,
    /// Time of the last successful user command
    pub last_action_at: Option<OffsetDateTime>,
    /// Progress of the last command
    pub phase: CommandPhase,
}

impl DeviceStatus {
    pub fn last_action_age(&self, now: OffsetDateTime) -> Option<Duration> {
        self.last_action_at.map(|at| now - at)
    }
}

/// On-disk shape of [`DeviceStatus`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedStatus {
    pub is_online: bool,
    pub current_color: Color,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub last_seen: Option<OffsetDateTime>,
    #[serde(default)]
    pub last_action: String,
    #[serde(default)]
    pub selected_color: Option<Color>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    #[serde(
        with = "time::serde::rfc3339::option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_action_at: Option<OffsetDateTime>,
}

impl PersistedStatus {
    pub fn capture(status: &DeviceStatus, now: OffsetDateTime) -> Self {
        Self {
            is_online: status.is_online,
            current_color: status.current_color.clone(),
            last_seen: status.last_seen,
            last_action: status.last_action.clone(),
            selected_color: status.selected_color.clone(),
            last_updated: now,
            last_action_at: status.last_action_at,
        }
    }

    pub fn is_fresh(&self, now: OffsetDateTime, cache_duration: Duration) -> bool {
        now - self.last_updated <= cache_duration
    }

    /// Rebuilds the live status. Past `cache_duration` only the colors
    /// survive; everything else falls back to defaults.
    pub fn restore(self, now: OffsetDateTime, cache_duration: Duration) -> DeviceStatus {
        if self.is_fresh(now, cache_duration) {
            DeviceStatus {
                is_online: self.is_online,
                current_color: self.current_color,
                last_seen: self.last_seen,
                last_action: self.last_action,
                selected_color: self.selected_color,
                last_action_at: self.last_action_at,
                phase: CommandPhase::Idle,
            }
        } else {
            DeviceStatus {
                current_color: self.current_color,
                selected_color: self.selected_color,
                ..DeviceStatus::default()
            }
        }
    }
}
