mod client;
mod settings;
mod storage;

pub use client::{ClientError, MISSING_USER_ID};
pub use settings::SettingsError;
pub use storage::StorageError;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
