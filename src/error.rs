//! Error types for the bridge and its engine collaborator.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by a [`ScriptEngine`](crate::engine::ScriptEngine)
/// implementation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine could not create or open its execution context.
    #[error("engine failed to start: {0}")]
    Startup(String),

    /// The executed command text raised an error.
    #[error("{0}")]
    Execution(String),

    /// The session was used after it was closed.
    #[error("engine session is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced to the external caller.
///
/// Only synchronous calls return these. Failures inside an asynchronous
/// invocation are reported through the `error` notification instead.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Blank text where blank is not silently ignored.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A script file path did not resolve.
    #[error("script file '{}' not found", path.display())]
    NotFound { path: PathBuf },

    /// The session could not be opened. Not recoverable locally.
    #[error("session could not be opened: {0}")]
    Fatal(#[source] EngineError),

    /// The executed command text failed, or its worker caught a panic.
    #[error("script failure: {0}")]
    ScriptFailure(String),

    /// The worker pool no longer accepts work.
    #[error("worker pool unavailable: {0}")]
    WorkerPool(String),
}

impl BridgeError {
    /// Short classification used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::InvalidArgument(_) => "invalid_argument",
            BridgeError::NotFound { .. } => "not_found",
            BridgeError::Fatal(_) => "fatal",
            BridgeError::ScriptFailure(_) => "script_failure",
            BridgeError::WorkerPool(_) => "worker_pool",
        }
    }
}
