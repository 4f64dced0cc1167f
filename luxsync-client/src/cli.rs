use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use luxsync_api::{Color, DeviceStatus, PersistedStatus};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::app::DeviceContext;
use crate::services::CommandOutcome;

#[derive(Debug, Parser)]
#[command(name = "luxsync", version, about = "Control a Luxafor light through its webhook API")]
pub struct Cli {
    /// Settings file layered over the built-in defaults
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Set a solid color (name or hex such as FF8800)
    Color { color: Color },
    /// Blink a color, then return to the previous one
    Blink { color: Color },
    /// Turn the light off
    Off,
    /// Send a white blink to verify the webhook credentials
    Test,
    /// Print the last known status
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Probe the API now, ignoring the grace window
    Check,
    /// Run periodic health checks and print every status change
    Watch,
    /// Forget the stored status
    Reset,
}

/// Runs one command and reports whether it succeeded.
pub async fn execute(context: &DeviceContext, command: Command) -> bool {
    match command {
        Command::Color { color } => report(context.commands.set_solid_color(color).await),
        Command::Blink { color } => {
            let success = report(context.commands.blink(color).await);
            context.hub.wait_for_restore().await;
            success
        }
        Command::Off => report(context.commands.turn_off().await),
        Command::Test => report(context.commands.test_connection().await),
        Command::Status { json } => {
            let status = context.hub.status().await;
            if json {
                let record = PersistedStatus::capture(&status, OffsetDateTime::now_utc());
                match serde_json::to_string_pretty(&record) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("✗ {e}");
                        return false;
                    }
                }
            } else {
                println!("{}", describe(&status));
            }
            true
        }
        Command::Check => {
            let online = context.health.force_check().await;
            println!("{}", if online { "● online" } else { "○ offline" });
            online
        }
        Command::Watch => watch(context).await,
        Command::Reset => {
            context.hub.reset().await;
            println!("✓ Status cleared");
            true
        }
    }
}

async fn watch(context: &DeviceContext) -> bool {
    let last = Mutex::new(None::<DeviceStatus>);
    let _subscription = context.hub.subscribe(move |status: &DeviceStatus| {
        let mut last = last.lock().unwrap_or_else(|e| e.into_inner());
        // the delayed re-notification repeats the same snapshot
        if last.as_ref() != Some(status) {
            println!("{}", describe(status));
            *last = Some(status.clone());
        }
    });

    if !context.health.start() {
        return false;
    }

    let result = tokio::signal::ctrl_c().await;
    context.health.stop();

    result.is_ok()
}

fn report(outcome: CommandOutcome) -> bool {
    match &outcome.error {
        None => println!("✓ Done"),
        Some(error) => eprintln!("✗ {error}"),
    }
    outcome.success
}

pub fn describe(status: &DeviceStatus) -> String {
    let online = if status.is_online { "● online " } else { "○ offline" };
    let seen = status
        .last_seen
        .and_then(|at| at.format(&Rfc3339).ok())
        .unwrap_or_else(|| String::from("never"));

    let mut line = format!("{online}  color: {}  last seen: {seen}", status.current_color);
    if !status.last_action.is_empty() {
        line.push_str(&format!("  last action: {}", status.last_action));
    }
    line
}
