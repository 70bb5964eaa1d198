//! Asynchronous bridge between a non-blocking, event-driven caller and a
//! blocking, callback-oriented scripting engine.
//!
//! The caller submits command text and returns at once. The engine runs on a
//! worker thread, streams output through the [`bus::NotificationBus`], and
//! blocks on the [`host::InputHandshake`] whenever the script asks for input
//! until the caller supplies it. The last result is cached for pulling.

pub mod bridge;
pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod result;
pub mod session;
pub mod telemetry;
pub mod worker;

pub use bridge::{Bridge, InvocationId};
pub use bus::{BridgeEvent, BridgeObserver, EventStream, SubscriptionId};
pub use config::{BridgeConfig, ConfigError, HostConfig};
pub use engine::{ProcessEngine, ScriptEngine};
pub use error::{BridgeError, EngineError};
pub use result::LastResult;
