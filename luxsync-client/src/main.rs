use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use luxsync_client::cli::Cli;
use luxsync_client::configs::Settings;
use luxsync_client::run;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load(Some(path.as_path())),
        None => Settings::new(),
    };
    let settings = Arc::new(settings.expect("Failed to load settings."));

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let app_name = env!("CARGO_PKG_NAME").replace('-', "_");
            let level = settings.logger.level.as_str();

            format!("{app_name}={level}").into()
        }))
        .with_writer(std::io::stderr)
        .init();

    if run(&settings, cli.command).await {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
