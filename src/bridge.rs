//! The invocation pipeline and the caller-facing surface.
//!
//! ```text
//!   caller ── submit ──▶ WorkerPool ──▶ EngineSession::invoke
//!     ▲                                  │ write_* / emit        │ read_line / prompt*
//!     │                                  ▼                       ▼
//!     └──── NotificationBus ◀──── BridgeHostUi ──▶ InputHandshake ◀── supply_input
//! ```
//!
//! Every non-blank submission yields exactly one `invocation_completed`
//! notification, preceded by `result_ready` on success or `error` on failure.
//! In-flight invocations cannot be cancelled.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use crate::bus::{BridgeObserver, EventStream, NotificationBus, SubscriptionId};
use crate::config::BridgeConfig;
use crate::engine::{EngineSession, HostInfo, Script, ScriptEngine};
use crate::error::BridgeError;
use crate::host::{BridgeHostUi, InputHandshake};
use crate::result::{LastResult, ResultCache};
use crate::session::SessionHandle;
use crate::worker::WorkerPool;

/// Identity of one submitted invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvocationId(Uuid);

impl InvocationId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Drives one engine session asynchronously on behalf of a caller that must
/// never block.
///
/// The caller is expected to answer an outstanding prompt before submitting
/// further interactive work; invocations are not queued against each other
/// beyond the worker pool's capacity.
pub struct Bridge {
    engine: Arc<dyn ScriptEngine>,
    session: SessionHandle,
    bus: NotificationBus,
    handshake: Arc<InputHandshake>,
    host_ui: Arc<BridgeHostUi>,
    results: Arc<ResultCache>,
    pool: WorkerPool,
    host_info: HostInfo,
}

impl Bridge {
    pub fn new(engine: Arc<dyn ScriptEngine>) -> Result<Self, BridgeError> {
        Self::with_config(engine, BridgeConfig::default())
    }

    pub fn with_config(
        engine: Arc<dyn ScriptEngine>,
        config: BridgeConfig,
    ) -> Result<Self, BridgeError> {
        let host_info = HostInfo {
            name: config.host.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instance_id: Uuid::new_v4(),
        };
        let bus = NotificationBus::new();
        let handshake = Arc::new(InputHandshake::new(bus.clone()));
        let host_ui = Arc::new(BridgeHostUi::new(
            bus.clone(),
            Arc::clone(&handshake),
            config.host,
        ));
        let pool = WorkerPool::new(config.worker_threads)?;

        tracing::debug!(
            engine = engine.name(),
            host = %host_info.name,
            instance_id = %host_info.instance_id,
            workers = pool.size(),
            "bridge created"
        );

        Ok(Self {
            session: SessionHandle::new(Arc::clone(&engine), host_info.clone()),
            engine,
            bus,
            handshake,
            host_ui,
            results: Arc::new(ResultCache::new()),
            pool,
            host_info,
        })
    }

    pub fn host_info(&self) -> &HostInfo {
        &self.host_info
    }

    pub fn subscribe(&self, observer: Arc<dyn BridgeObserver>) -> SubscriptionId {
        self.bus.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Subscribe a channel-backed stream of every notification.
    pub fn events(&self) -> EventStream {
        EventStream::subscribe(&self.bus)
    }

    /// Open the session. Idempotent.
    pub fn initialize(&self) -> Result<(), BridgeError> {
        self.session.open().map(|_| ())
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_open()
    }

    /// Queue `command` for execution and return immediately.
    ///
    /// Blank text is ignored: nothing runs and nothing is notified.
    pub fn submit(&self, command: &str) -> Result<Option<InvocationId>, BridgeError> {
        if command.trim().is_empty() {
            tracing::trace!("blank command ignored");
            return Ok(None);
        }
        self.dispatch(Script::local(command)).map(Some)
    }

    /// Run a script file dot-sourced into the session's shared scope.
    pub fn run_from_file(&self, path: impl AsRef<Path>) -> Result<InvocationId, BridgeError> {
        let path = path.as_ref();
        if path.to_string_lossy().trim().is_empty() {
            return Err(BridgeError::InvalidArgument(
                "script path must not be blank".to_string(),
            ));
        }

        let resolved = std::fs::canonicalize(path)
            .ok()
            .filter(|resolved| resolved.is_file())
            .ok_or_else(|| BridgeError::NotFound {
                path: path.to_path_buf(),
            })?;

        let command = self.engine.dot_source_command(&resolved);
        self.dispatch(Script::dot_sourced(command))
    }

    /// Answer the outstanding prompt, or buffer for the next one.
    pub fn supply_input(&self, value: impl Into<String>) {
        self.handshake.supply(Some(value.into()));
    }

    /// Number of invocations currently blocked waiting for input.
    pub fn pending_prompts(&self) -> usize {
        self.handshake.waiting()
    }

    pub fn pull_result(&self) -> LastResult {
        self.results.get()
    }

    /// Close the session. Idempotent and infallible.
    pub fn dispose(&self) {
        self.session.close();
    }

    fn dispatch(&self, script: Script) -> Result<InvocationId, BridgeError> {
        let (session_id, session) = self.session.ensure_open()?;
        let id = InvocationId::new();

        let invocation = Invocation {
            id,
            script,
            session,
            host_ui: Arc::clone(&self.host_ui),
            bus: self.bus.clone(),
            results: Arc::clone(&self.results),
        };
        self.pool.execute(move || invocation.run())?;

        tracing::debug!(invocation_id = %id, session_id = %session_id, "invocation queued");
        Ok(id)
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.dispose();
        self.pool.shutdown();
    }
}

/// Everything one worker needs to run one submission.
struct Invocation {
    id: InvocationId,
    script: Script,
    session: Arc<dyn EngineSession>,
    host_ui: Arc<BridgeHostUi>,
    bus: NotificationBus,
    results: Arc<ResultCache>,
}

impl Invocation {
    fn run(self) {
        let span = tracing::debug_span!("invocation", invocation_id = %self.id);
        let _entered = span.enter();

        let bus = self.bus.clone();
        let _completion = scopeguard::guard((), move |_| bus.invocation_completed());

        match self.execute() {
            Ok(()) => {
                tracing::debug!("invocation succeeded");
                self.bus.result_ready();
            }
            Err(err) => {
                tracing::warn!(error = %err, kind = err.kind(), "invocation failed");
                self.bus.error(&err.to_string());
            }
        }
    }

    fn execute(&self) -> Result<(), BridgeError> {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.session.invoke(&self.script, self.host_ui.as_ref())
        }));

        let output = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return Err(BridgeError::ScriptFailure(err.to_string())),
            Err(panic) => {
                return Err(BridgeError::ScriptFailure(format!(
                    "worker caught unexpected panic: {}",
                    panic_message(panic.as_ref())
                )))
            }
        };

        tracing::debug!(objects = output.len(), "materializing result");
        self.results.set(LastResult::from_output(output));
        Ok(())
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_string()
}
