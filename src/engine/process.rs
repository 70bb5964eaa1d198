use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serde_json::Value;
use uuid::Uuid;

use crate::engine::{
    EngineObject, EngineSession, HostInfo, HostUserInterface, Script, ScriptEngine, StreamEvent,
};
use crate::error::EngineError;

/// Engine that runs each invocation through a system shell.
///
/// Each stdout line becomes one output object; each stderr line is emitted on
/// the error stream as it arrives. The shell process does not outlive the
/// invocation, so only the working directory is shared across invocations.
/// Stdin is closed: the shell never reads through the host, so it raises no
/// prompts.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    shell: String,
    command_flag: String,
}

impl ProcessEngine {
    pub fn new(shell: impl Into<String>, command_flag: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            command_flag: command_flag.into(),
        }
    }

    /// `sh -c` on Unix, `cmd /C` elsewhere.
    pub fn system_default() -> Self {
        if cfg!(windows) {
            Self::new("cmd", "/C")
        } else {
            Self::new("sh", "-c")
        }
    }
}

impl Default for ProcessEngine {
    fn default() -> Self {
        Self::system_default()
    }
}

impl ScriptEngine for ProcessEngine {
    fn name(&self) -> &'static str {
        "process"
    }

    fn open(&self, host: &HostInfo) -> Result<Arc<dyn EngineSession>, EngineError> {
        let working_dir = std::env::current_dir()
            .map_err(|e| EngineError::Startup(format!("no working directory: {e}")))?;

        // A missing shell binary fails here rather than on first use.
        Command::new(&self.shell)
            .arg(&self.command_flag)
            .arg("exit 0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| EngineError::Startup(format!("cannot start '{}': {e}", self.shell)))?;

        tracing::debug!(shell = %self.shell, host = %host.name, "process engine opened");

        Ok(Arc::new(ProcessSession {
            id: Uuid::new_v4(),
            shell: self.shell.clone(),
            command_flag: self.command_flag.clone(),
            working_dir,
            open: AtomicBool::new(true),
        }))
    }

    fn dot_source_command(&self, path: &Path) -> String {
        let path = path.to_string_lossy();
        if cfg!(windows) {
            format!("call \"{}\"", path)
        } else {
            format!(". '{}'", path.replace('\'', "'\\''"))
        }
    }
}

struct ProcessSession {
    id: Uuid,
    shell: String,
    command_flag: String,
    working_dir: PathBuf,
    open: AtomicBool,
}

impl EngineSession for ProcessSession {
    fn invoke(
        &self,
        script: &Script,
        host: &dyn HostUserInterface,
    ) -> Result<Vec<EngineObject>, EngineError> {
        if !self.is_open() {
            return Err(EngineError::Closed);
        }

        let mut child = Command::new(&self.shell)
            .arg(&self.command_flag)
            .arg(&script.text)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Execution("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Execution("stderr not captured".to_string()))?;

        let output = thread::scope(|scope| {
            scope.spawn(move || {
                let read = for_each_line(BufReader::new(stderr), |line| {
                    host.emit(StreamEvent::error(line));
                });
                if let Err(err) = read {
                    tracing::warn!(error = %err, "stderr read failed");
                }
            });

            let mut output = Vec::new();
            for_each_line(BufReader::new(stdout), |line| {
                output.push(EngineObject::new(Value::String(line)).with_type_name("System.String"));
            })
            .map(|()| output)
        });

        // Reap the child before surfacing any read failure.
        let status = child.wait()?;
        let output = output?;
        tracing::trace!(session = %self.id, ?status, objects = output.len(), "shell exited");

        if !status.success() {
            return Err(EngineError::Execution(format!(
                "'{}' exited with {}",
                self.shell, status
            )));
        }

        Ok(output)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) -> Result<(), EngineError> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Feed each line of `reader` to `f` without its line terminator.
///
/// Bytes that are not valid UTF-8 are replaced rather than failing the read.
fn for_each_line<R: BufRead>(mut reader: R, mut f: impl FnMut(String)) -> io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        f(String::from_utf8_lossy(&buf).into_owned());
    }
}
