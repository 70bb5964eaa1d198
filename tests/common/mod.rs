//! Shared fixtures for bridge integration tests.

#![allow(dead_code, unused_imports)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use hostbridge::engine::{EngineObject, EngineSession, HostInfo, HostUserInterface, Script};
use hostbridge::{Bridge, BridgeConfig, BridgeEvent, BridgeObserver, EngineError, ScriptEngine};

pub const WAIT: Duration = Duration::from_secs(5);

type Behavior =
    Arc<dyn Fn(&dyn HostUserInterface) -> Result<Vec<EngineObject>, EngineError> + Send + Sync>;

/// Engine whose sessions look up each command text in a table of behaviors.
///
/// Unknown commands fail with an execution error naming the command.
#[derive(Default)]
pub struct ScriptedEngine {
    behaviors: Arc<Mutex<HashMap<String, Behavior>>>,
    invoked: Arc<Mutex<Vec<Script>>>,
    pub opens: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    pub fail_open: AtomicBool,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on<F>(&self, command: &str, behavior: F)
    where
        F: Fn(&dyn HostUserInterface) -> Result<Vec<EngineObject>, EngineError>
            + Send
            + Sync
            + 'static,
    {
        self.behaviors
            .lock()
            .insert(command.to_string(), Arc::new(behavior));
    }

    pub fn invoked(&self) -> Vec<Script> {
        self.invoked.lock().clone()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl ScriptEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn open(&self, _host: &HostInfo) -> Result<Arc<dyn EngineSession>, EngineError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(EngineError::Startup("scripted engine unavailable".to_string()));
        }
        Ok(Arc::new(ScriptedSession {
            behaviors: Arc::clone(&self.behaviors),
            invoked: Arc::clone(&self.invoked),
            closes: Arc::clone(&self.closes),
            open: AtomicBool::new(true),
        }))
    }
}

struct ScriptedSession {
    behaviors: Arc<Mutex<HashMap<String, Behavior>>>,
    invoked: Arc<Mutex<Vec<Script>>>,
    closes: Arc<AtomicUsize>,
    open: AtomicBool,
}

impl EngineSession for ScriptedSession {
    fn invoke(
        &self,
        script: &Script,
        host: &dyn HostUserInterface,
    ) -> Result<Vec<EngineObject>, EngineError> {
        self.invoked.lock().push(script.clone());
        let behavior = self.behaviors.lock().get(&script.text).cloned();
        match behavior {
            Some(behavior) => behavior(host),
            None => Err(EngineError::Execution(format!(
                "unknown command: {}",
                script.text
            ))),
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) -> Result<(), EngineError> {
        self.open.store(false, Ordering::SeqCst);
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Observer that records every event and lets tests wait on them.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<BridgeEvent>>,
    changed: Condvar,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, event: BridgeEvent) {
        self.events.lock().push(event);
        self.changed.notify_all();
    }

    pub fn snapshot(&self) -> Vec<BridgeEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&BridgeEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| matches(e)).count()
    }

    /// Block until `done` holds for the recorded events or the wait times out.
    pub fn wait_until(&self, done: impl Fn(&[BridgeEvent]) -> bool) -> Vec<BridgeEvent> {
        let deadline = Instant::now() + WAIT;
        let mut events = self.events.lock();
        while !done(&events) {
            if self.changed.wait_until(&mut events, deadline).timed_out() {
                panic!("timed out waiting for events; saw {:?}", *events);
            }
        }
        events.clone()
    }

    pub fn wait_for_completions(&self, n: usize) -> Vec<BridgeEvent> {
        self.wait_until(|events| {
            events
                .iter()
                .filter(|e| **e == BridgeEvent::InvocationCompleted)
                .count()
                >= n
        })
    }

    pub fn wait_for_prompts(&self, n: usize) -> Vec<BridgeEvent> {
        self.wait_until(|events| {
            events
                .iter()
                .filter(|e| matches!(e, BridgeEvent::Prompt(_)))
                .count()
                >= n
        })
    }
}

impl BridgeObserver for EventLog {
    fn on_output(&self, text: &str) {
        self.push(BridgeEvent::Output(text.to_string()));
    }

    fn on_error(&self, text: &str) {
        self.push(BridgeEvent::Error(text.to_string()));
    }

    fn on_prompt(&self, prompt: &str) {
        self.push(BridgeEvent::Prompt(prompt.to_string()));
    }

    fn on_result_ready(&self) {
        self.push(BridgeEvent::ResultReady);
    }

    fn on_invocation_completed(&self) {
        self.push(BridgeEvent::InvocationCompleted);
    }
}

/// Bridge over `engine` with an event log already subscribed.
pub fn bridge_with_log(engine: Arc<ScriptedEngine>) -> (Bridge, Arc<EventLog>) {
    let config = BridgeConfig {
        worker_threads: 2,
        ..BridgeConfig::default()
    };
    let bridge = Bridge::with_config(engine, config).expect("bridge");
    let log = EventLog::new();
    bridge.subscribe(log.clone());
    (bridge, log)
}

/// Wait until at least one invocation is parked on input.
pub fn wait_for_pending(bridge: &Bridge) {
    let deadline = Instant::now() + WAIT;
    while bridge.pending_prompts() == 0 {
        assert!(Instant::now() < deadline, "no invocation started waiting");
        std::thread::sleep(Duration::from_millis(5));
    }
}
