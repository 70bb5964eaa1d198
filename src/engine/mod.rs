//! The scripting engine seam.
//!
//! The bridge does not interpret command text itself. An engine implementation
//! owns the stateful execution context, runs command text against it, and calls
//! back into a [`HostUserInterface`] for output and interactive input. Only the
//! implementation files depend on a concrete engine.

mod process;
mod secure;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::EngineError;

pub use process::ProcessEngine;
pub use secure::{Credential, SecureString};

/// Category of a stream event emitted during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Output,
    Error,
    Warning,
    Information,
    Debug,
    Verbose,
}

/// A categorized text message. Forwarded immediately, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub kind: StreamKind,
    pub text: String,
}

impl StreamEvent {
    pub fn new(kind: StreamKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(StreamKind::Error, text)
    }
}

/// Where command text executes relative to the session's shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeMode {
    /// Variables defined by the command stay local to the invocation.
    #[default]
    Local,
    /// Dot-sourced: definitions land in the session's shared scope.
    Caller,
}

/// One unit of command text to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub text: String,
    pub scope: ScopeMode,
}

impl Script {
    pub fn local(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            scope: ScopeMode::Local,
        }
    }

    pub fn dot_sourced(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            scope: ScopeMode::Caller,
        }
    }
}

/// An output object produced by an invocation.
///
/// Engines may wrap values with type metadata; the bridge only keeps the
/// underlying base value when it materializes a result.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineObject {
    value: Value,
    type_name: Option<String>,
}

impl EngineObject {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            type_name: None,
        }
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn base_value(&self) -> &Value {
        &self.value
    }

    pub fn into_base_value(self) -> Value {
        self.value
    }
}

/// Identity of the host presented to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub name: String,
    pub version: String,
    pub instance_id: Uuid,
}

/// A named field requested by a structured prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescription {
    pub name: String,
}

impl FieldDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One option offered by a choice prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceDescription {
    pub label: String,
    pub help_message: Option<String>,
}

impl ChoiceDescription {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            help_message: None,
        }
    }
}

/// Callback surface an engine requires from its host.
///
/// Write methods never block. Read and prompt methods block the calling
/// thread until the external caller answers.
pub trait HostUserInterface: Send + Sync {
    fn write(&self, text: &str);

    fn write_line(&self, text: &str);

    fn write_error_line(&self, text: &str);

    fn write_warning_line(&self, text: &str);

    fn write_debug_line(&self, text: &str);

    fn write_verbose_line(&self, text: &str);

    /// Progress records are accepted and dropped by default.
    fn write_progress(&self, _source_id: i64, _activity: &str) {}

    fn read_line(&self) -> String;

    fn read_line_as_secure_string(&self) -> SecureString;

    /// Ask for each field in turn; returns values keyed by field name.
    fn prompt(
        &self,
        caption: &str,
        message: &str,
        fields: &[FieldDescription],
    ) -> BTreeMap<String, String>;

    /// Returns a zero-based index into `choices`.
    fn prompt_for_choice(
        &self,
        caption: &str,
        message: &str,
        choices: &[ChoiceDescription],
        default_choice: usize,
    ) -> usize;

    fn prompt_for_credential(
        &self,
        caption: &str,
        message: &str,
        user_name: &str,
        target_name: &str,
    ) -> Credential;

    /// Forward a stream record emitted by the engine.
    fn emit(&self, event: StreamEvent) {
        match event.kind {
            StreamKind::Output | StreamKind::Information => self.write_line(&event.text),
            StreamKind::Error => self.write_error_line(&event.text),
            StreamKind::Warning => self.write_warning_line(&event.text),
            StreamKind::Debug => self.write_debug_line(&event.text),
            StreamKind::Verbose => self.write_verbose_line(&event.text),
        }
    }
}

/// An open, stateful execution context.
pub trait EngineSession: Send + Sync {
    /// Run `script` in a fresh execution unit bound to this session.
    ///
    /// Stream events go through `host` as they happen. Returns the ordered
    /// output objects.
    fn invoke(
        &self,
        script: &Script,
        host: &dyn HostUserInterface,
    ) -> Result<Vec<EngineObject>, EngineError>;

    fn is_open(&self) -> bool;

    fn close(&self) -> Result<(), EngineError>;
}

/// Factory for engine sessions.
pub trait ScriptEngine: Send + Sync {
    /// Returns the name of this engine for logging.
    fn name(&self) -> &'static str;

    fn open(&self, host: &HostInfo) -> Result<Arc<dyn EngineSession>, EngineError>;

    /// Command text that runs `path` in the caller's scope.
    ///
    /// The default wraps the path in single quotes and doubles embedded
    /// single quotes.
    fn dot_source_command(&self, path: &Path) -> String {
        let path = path.to_string_lossy();
        format!(". '{}'", path.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    struct Quiet;

    impl ScriptEngine for Quiet {
        fn name(&self) -> &'static str {
            "quiet"
        }

        fn open(&self, _host: &HostInfo) -> Result<Arc<dyn EngineSession>, EngineError> {
            Err(EngineError::Startup("unused".to_string()))
        }
    }

    #[derive(Default)]
    struct Recorder {
        lines: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, line: String) {
            self.lines.lock().push(line);
        }
    }

    impl HostUserInterface for Recorder {
        fn write(&self, text: &str) {
            self.push(format!("write:{text}"));
        }
        fn write_line(&self, text: &str) {
            self.push(format!("line:{text}"));
        }
        fn write_error_line(&self, text: &str) {
            self.push(format!("error:{text}"));
        }
        fn write_warning_line(&self, text: &str) {
            self.push(format!("warning:{text}"));
        }
        fn write_debug_line(&self, text: &str) {
            self.push(format!("debug:{text}"));
        }
        fn write_verbose_line(&self, text: &str) {
            self.push(format!("verbose:{text}"));
        }
        fn read_line(&self) -> String {
            String::new()
        }
        fn read_line_as_secure_string(&self) -> SecureString {
            SecureString::new()
        }
        fn prompt(
            &self,
            _caption: &str,
            _message: &str,
            _fields: &[FieldDescription],
        ) -> BTreeMap<String, String> {
            BTreeMap::new()
        }
        fn prompt_for_choice(
            &self,
            _caption: &str,
            _message: &str,
            _choices: &[ChoiceDescription],
            default_choice: usize,
        ) -> usize {
            default_choice
        }
        fn prompt_for_credential(
            &self,
            _caption: &str,
            _message: &str,
            user_name: &str,
            _target_name: &str,
        ) -> Credential {
            Credential::new(user_name, SecureString::new())
        }
    }

    #[test]
    fn default_dot_source_doubles_single_quotes() {
        let command = Quiet.dot_source_command(Path::new("/scripts/it's here.ps1"));
        assert_eq!(command, ". '/scripts/it''s here.ps1'");
    }

    #[test]
    fn emit_routes_each_kind_to_its_writer() {
        let host = Recorder::default();
        host.emit(StreamEvent::new(StreamKind::Output, "a"));
        host.emit(StreamEvent::new(StreamKind::Information, "b"));
        host.emit(StreamEvent::error("c"));
        host.emit(StreamEvent::new(StreamKind::Warning, "d"));
        host.emit(StreamEvent::new(StreamKind::Debug, "e"));
        host.emit(StreamEvent::new(StreamKind::Verbose, "f"));
        assert_eq!(
            *host.lines.lock(),
            vec![
                "line:a",
                "line:b",
                "error:c",
                "warning:d",
                "debug:e",
                "verbose:f"
            ]
        );
    }

    #[test]
    fn engine_object_unwraps_to_base_value() {
        let object = EngineObject::new(json!({"id": 7})).with_type_name("Deserialized.Row");
        assert_eq!(object.type_name(), Some("Deserialized.Row"));
        assert_eq!(object.base_value(), &json!({"id": 7}));
        assert_eq!(object.into_base_value(), json!({"id": 7}));
    }
}
