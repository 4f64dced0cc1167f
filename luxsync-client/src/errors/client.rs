use reqwest::StatusCode;

/// Shown whenever a command runs without a configured user id.
pub const MISSING_USER_ID: &str = "Please set your Luxafor User ID in the configuration";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Please set your Luxafor User ID in the configuration")]
    MissingUserId,

    #[error("Invalid color: {0}")]
    InvalidColor(#[from] luxsync_api::ParseColorError),

    #[error("Cannot send {0} to the device")]
    UnsupportedColor(luxsync_api::Color),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Luxafor API responded with {status}: {body}")]
    Api { status: StatusCode, body: String },
}
