use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use config::{Config, Environment, File, FileFormat, Map};
use luxsync_api::ApiRegion;
use serde::{Deserialize, Serialize};

use crate::errors::SettingsError;

const DEFAULT_SETTINGS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../",
    "configs/default.toml"
));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Webhook user id from the Luxafor app
    #[serde(default)]
    pub user_id: String,
    pub api_endpoint: ApiRegion,
    /// Overrides the regional host, e.g. for a local mock
    pub base_url: Option<String>,
}

impl Device {
    pub fn user_id(&self) -> Option<&str> {
        let user_id = self.user_id.trim();
        (!user_id.is_empty()).then_some(user_id)
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.api_endpoint.base_url())
            .trim_end_matches('/')
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub grace_period_secs: u64,
}

impl Health {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storage {
    pub path: Option<String>,
    pub cache_duration_secs: u64,
}

impl Storage {
    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_duration_secs)
    }

    /// Configured file, or `<data dir>/luxsync/storage.json`.
    pub fn resolve_path(&self) -> io::Result<PathBuf> {
        match &self.path {
            Some(path) => normalize_path(path),
            None => dirs::data_dir()
                .map(|dir| dir.join("luxsync").join("storage.json"))
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no data directory")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timing {
    pub renotify_delay_ms: u64,
    pub blink_restore_delay_ms: u64,
}

impl Timing {
    pub fn renotify_delay(&self) -> Duration {
        Duration::from_millis(self.renotify_delay_ms)
    }

    pub fn blink_restore_delay(&self) -> Duration {
        Duration::from_millis(self.blink_restore_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub device: Device,
    pub health: Health,
    pub storage: Storage,
    pub timing: Timing,
}

impl Settings {
    /// Built-in defaults, then `configs/<RUN_MODE>.toml` when present, then
    /// `LUXSYNC_*` environment variables.
    pub fn new() -> Result<Self, SettingsError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());
        let overlay = PathBuf::from(format!("configs/{run_mode}.toml"));

        Self::load(overlay.is_file().then_some(overlay.as_path()))
    }

    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let overlay = match path {
            Some(path) => Some(fs::read_to_string(path)?),
            None => None,
        };

        Self::from_sources(overlay.as_deref(), Some(env::vars().collect()))
    }

    /// Defaults and overlay only, the process environment is left out.
    pub fn from_layers(overlay: Option<&str>) -> Result<Self, SettingsError> {
        Self::from_sources(overlay, None)
    }

    /// Nested keys come from `LUXSYNC_<SECTION>__<KEY>` variables. The short
    /// `LUXSYNC_USER_ID`, `LUXSYNC_API_ENDPOINT` and `LUXSYNC_LOG_LEVEL`
    /// names win over everything else.
    pub fn from_sources(
        overlay: Option<&str>,
        vars: Option<Map<String, String>>,
    ) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .add_source(File::from_str(DEFAULT_SETTINGS, FileFormat::Toml));

        if let Some(overlay) = overlay {
            builder = builder.add_source(File::from_str(overlay, FileFormat::Toml));
        }

        if let Some(vars) = vars {
            let user_id = vars.get("LUXSYNC_USER_ID").cloned();
            let api_endpoint = vars.get("LUXSYNC_API_ENDPOINT").cloned();
            let level = vars.get("LUXSYNC_LOG_LEVEL").cloned();

            builder = builder
                .set_override_option("device.user_id", user_id)?
                .set_override_option("device.api_endpoint", api_endpoint)?
                .set_override_option("logger.level", level)?
                .add_source(
                    Environment::with_prefix("LUXSYNC")
                        .prefix_separator("_")
                        .separator("__")
                        .source(Some(vars)),
                );
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.health.interval_secs == 0 {
            return Err(SettingsError::Invalid("health.interval_secs must be positive".into()));
        }

        if self.health.timeout_secs == 0 {
            return Err(SettingsError::Invalid("health.timeout_secs must be positive".into()));
        }

        Ok(())
    }
}

fn normalize_path(path: &str) -> io::Result<PathBuf> {
    let path_buf = PathBuf::from(path);

    Ok(if path_buf.is_absolute() {
        path_buf
    } else {
        env::current_dir()?.join(path_buf)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_layers(None).unwrap();

        assert_eq!(settings.logger.level, "info");
        assert_eq!(settings.device.user_id(), None);
        assert_eq!(settings.device.base_url(), "https://api.luxafor.com");
        assert_eq!(settings.health.interval(), Duration::from_secs(30));
        assert_eq!(settings.health.timeout(), Duration::from_secs(5));
        assert_eq!(settings.health.grace_period(), Duration::from_secs(300));
        assert_eq!(settings.storage.cache_duration(), Duration::from_secs(300));
        assert_eq!(settings.timing.renotify_delay(), Duration::from_millis(50));
        assert_eq!(settings.timing.blink_restore_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_overlay_merges_sections() {
        let settings = Settings::from_layers(Some(
            r#"
            [device]
            user_id = "  4321 "
            api_endpoint = "co.uk"

            [health]
            interval_secs = 10
            "#,
        ))
        .unwrap();

        assert_eq!(settings.device.user_id(), Some("4321"));
        assert_eq!(settings.device.base_url(), "https://api.luxafor.co.uk");
        assert_eq!(settings.health.interval_secs, 10);
        // untouched keys of a merged section survive
        assert_eq!(settings.health.timeout_secs, 5);
    }

    #[test]
    fn test_base_url_override() {
        let settings = Settings::from_layers(Some(
            r#"
            [device]
            base_url = "http://127.0.0.1:9000/"
            "#,
        ))
        .unwrap();

        assert_eq!(settings.device.base_url(), "http://127.0.0.1:9000");
    }

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_environment_overrides() {
        let settings = Settings::from_sources(
            None,
            Some(vars(&[
                ("LUXSYNC_USER_ID", "777"),
                ("LUXSYNC_API_ENDPOINT", "co.uk"),
                ("LUXSYNC_HEALTH__INTERVAL_SECS", "12"),
                ("UNRELATED", "x"),
            ])),
        )
        .unwrap();

        assert_eq!(settings.device.user_id(), Some("777"));
        assert_eq!(settings.device.api_endpoint, ApiRegion::CoUk);
        assert_eq!(settings.health.interval_secs, 12);
        assert_eq!(settings.logger.level, "info");
    }

    #[test]
    fn test_short_names_win_over_overlay() {
        let settings = Settings::from_sources(
            Some("[device]\nuser_id = \"from-file\""),
            Some(vars(&[("LUXSYNC_USER_ID", "from-env")])),
        )
        .unwrap();

        assert_eq!(settings.device.user_id(), Some("from-env"));
    }

    #[test]
    fn test_unknown_endpoint_is_rejected() {
        let result = Settings::from_sources(None, Some(vars(&[("LUXSYNC_API_ENDPOINT", "mars")])));
        assert!(matches!(result, Err(SettingsError::Config(_))));
    }

    #[test]
    fn test_zero_durations_are_rejected() {
        assert!(matches!(
            Settings::from_layers(Some("[health]\ninterval_secs = 0")),
            Err(SettingsError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_layers(Some("[health]\ntimeout_secs = 0")),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_overlay() {
        assert!(matches!(
            Settings::from_layers(Some("[health]\ninterval_secs = \"soon\"")),
            Err(SettingsError::Config(_))
        ));
    }
}
