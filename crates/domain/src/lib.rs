//! Domain types for the study scheduler backend.

pub mod auth;
pub mod constraint;
pub mod energy;
pub mod errors;
pub mod recurrence;
pub mod reflection;
pub mod session;
pub mod subject;
pub mod task;
pub mod time_window;
pub mod user;

pub use auth::*;
pub use constraint::*;
pub use energy::*;
pub use errors::*;
pub use recurrence::*;
pub use reflection::*;
pub use session::*;
pub use subject::*;
pub use task::*;
pub use time_window::*;
pub use user::*;

/// Health check response.
#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub build_sha: String,
    pub uptime_seconds: u64,
}

/// Ready check response.
#[derive(Debug, serde::Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub database: String,
}
