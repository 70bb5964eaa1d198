//! Bridge configuration: worker pool size and host surface settings.

mod loader;
mod types;

pub use loader::ConfigError;
pub use types::{BridgeConfig, HostConfig};
