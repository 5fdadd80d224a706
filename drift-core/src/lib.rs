pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod selector;
pub mod telemetry;

pub use config::MonitorConfig;
pub use error::{ConfigError, QueryError, TriggerError};
