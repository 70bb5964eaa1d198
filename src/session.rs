//! Lifecycle of the single shared engine session.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::engine::{EngineSession, HostInfo, ScriptEngine};
use crate::error::BridgeError;

/// Owns the one open engine session.
///
/// Opening is idempotent while the session stays open. Closing is safe to
/// repeat and never fails; engine close errors are logged and dropped.
pub struct SessionHandle {
    engine: Arc<dyn ScriptEngine>,
    host: HostInfo,
    state: Mutex<Option<OpenSession>>,
}

struct OpenSession {
    id: Uuid,
    session: Arc<dyn EngineSession>,
}

impl SessionHandle {
    pub fn new(engine: Arc<dyn ScriptEngine>, host: HostInfo) -> Self {
        Self {
            engine,
            host,
            state: Mutex::new(None),
        }
    }

    /// Open the session if it is not already open. Returns its identity.
    pub fn open(&self) -> Result<Uuid, BridgeError> {
        self.ensure_open().map(|(id, _)| id)
    }

    /// Open if needed and hand out the live session.
    pub fn ensure_open(&self) -> Result<(Uuid, Arc<dyn EngineSession>), BridgeError> {
        let mut state = self.state.lock();

        if let Some(open) = state.as_ref() {
            if open.session.is_open() {
                return Ok((open.id, Arc::clone(&open.session)));
            }
            tracing::warn!(session_id = %open.id, "engine session closed underneath; reopening");
        }

        let session = self.engine.open(&self.host).map_err(|err| {
            tracing::error!(engine = self.engine.name(), error = %err, "engine failed to open");
            BridgeError::Fatal(err)
        })?;
        let id = Uuid::new_v4();
        tracing::info!(session_id = %id, engine = self.engine.name(), "session opened");

        *state = Some(OpenSession {
            id,
            session: Arc::clone(&session),
        });
        Ok((id, session))
    }

    pub fn close(&self) {
        let Some(open) = self.state.lock().take() else {
            return;
        };

        match catch_unwind(AssertUnwindSafe(|| open.session.close())) {
            Ok(Ok(())) => tracing::info!(session_id = %open.id, "session closed"),
            Ok(Err(err)) => {
                tracing::warn!(session_id = %open.id, error = %err, "engine close failed; ignored")
            }
            Err(_) => tracing::warn!(session_id = %open.id, "engine close panicked; ignored"),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state
            .lock()
            .as_ref()
            .is_some_and(|open| open.session.is_open())
    }

    pub fn id(&self) -> Option<Uuid> {
        self.state.lock().as_ref().map(|open| open.id)
    }
}
