pub mod auth;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod profile;
pub mod router;
pub mod server;
pub mod telemetry;
pub mod throttle;

pub use config::{Args, Config};
pub use server::build_server;
