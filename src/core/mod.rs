//! Configuration, privilege context and host wiring

pub mod admin;
pub mod config;
pub mod host;

pub use admin::AdminContext;
pub use config::{AppConfig, ConfigError, ReclaimConfig, SamplingConfig};
pub use host::Host;
