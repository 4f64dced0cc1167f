pub mod app;
pub mod cli;
pub mod configs;
pub mod errors;
pub mod services;

use std::sync::Arc;

use crate::app::DeviceContext;
use crate::cli::Command;
use crate::configs::Settings;

pub async fn run(settings: &Arc<Settings>, command: Command) -> bool {
    let context = DeviceContext::from_settings(settings).await;

    tracing::debug!(command = ?command, "running");

    cli::execute(&context, command).await
}
