#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load settings: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}
