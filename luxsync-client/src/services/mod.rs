pub mod command_service;
pub mod health_service;
pub mod status_hub;
pub mod status_store;
pub mod webhook_service;

pub use command_service::{CommandIssuer, CommandOutcome};
pub use health_service::{HealthChecker, infer_online};
pub use status_hub::{Revision, StatusHub, Subscription, Transition};
pub use status_store::StatusStore;
pub use webhook_service::WebhookClient;
