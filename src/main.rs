use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;

use hostbridge::telemetry::init_tracing;
use hostbridge::{Bridge, BridgeConfig, BridgeObserver, LastResult, ProcessEngine};

#[derive(Parser, Debug)]
#[command(
    name = "hostbridge",
    version,
    about = "Drive a shell session through the asynchronous host bridge",
    after_help = "Shell commands run with stdin closed and never prompt. Lines typed while a \
                  prompt is pending are only consumed by engines that read through the host."
)]
struct Cli {
    /// Config file (default: the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Shell used to run each command
    #[arg(long)]
    shell: Option<String>,

    /// Override the invocation worker count
    #[arg(long)]
    workers: Option<usize>,

    /// Script run dot-sourced before reading commands from stdin
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BridgeConfig::load_from(path)?,
        None => BridgeConfig::load()?,
    };
    if let Some(workers) = cli.workers {
        config.worker_threads = workers;
    }
    config.validate()?;

    let engine = match cli.shell {
        Some(shell) => ProcessEngine::new(shell, if cfg!(windows) { "/C" } else { "-c" }),
        None => ProcessEngine::system_default(),
    };
    let bridge = Arc::new(Bridge::with_config(Arc::new(engine), config)?);
    bridge
        .initialize()
        .context("failed to open the shell session")?;

    let completed = Arc::new(AtomicUsize::new(0));
    let (completion_tx, completion_rx) = mpsc::channel();
    bridge.subscribe(Arc::new(ConsolePrinter {
        bridge: Arc::downgrade(&bridge),
        completed: Arc::clone(&completed),
        done: completion_tx,
    }));

    let mut submitted = 0usize;
    if let Some(script) = &cli.script {
        bridge.run_from_file(script)?;
        submitted += 1;
    }

    for line in io::stdin().lock().lines() {
        let line = line?;
        match line.trim() {
            ":quit" => break,
            ":result" => print_json(&bridge.pull_result())?,
            _ if bridge.pending_prompts() > 0 => bridge.supply_input(line.as_str()),
            _ => {
                if bridge.submit(&line)?.is_some() {
                    submitted += 1;
                }
            }
        }
    }

    // Let in-flight work finish, unless it is stuck waiting on input that will never come.
    while completed.load(Ordering::SeqCst) < submitted {
        if bridge.pending_prompts() > 0 {
            break;
        }
        let _ = completion_rx.recv_timeout(Duration::from_millis(100));
    }

    bridge.dispose();
    Ok(())
}

/// Echoes notifications to the terminal as they happen on the worker.
///
/// Results are pulled inside `on_result_ready`, before the invocation's
/// completion is announced.
struct ConsolePrinter {
    bridge: Weak<Bridge>,
    completed: Arc<AtomicUsize>,
    done: mpsc::Sender<()>,
}

impl BridgeObserver for ConsolePrinter {
    fn on_output(&self, text: &str) {
        println!("{text}");
    }

    fn on_error(&self, text: &str) {
        eprintln!("error: {text}");
    }

    fn on_prompt(&self, prompt: &str) {
        print!("{prompt} ");
        let _ = io::stdout().flush();
    }

    fn on_result_ready(&self) {
        if let Some(bridge) = self.bridge.upgrade() {
            print_result(bridge.pull_result());
        }
    }

    fn on_invocation_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        let _ = self.done.send(());
    }
}

fn print_result(result: LastResult) {
    let values = match result {
        LastResult::Empty => return,
        LastResult::Single(value) => vec![value],
        LastResult::Many(values) => values,
    };
    for value in values {
        match value {
            Value::String(text) => println!("{text}"),
            other => println!("{other}"),
        }
    }
}

fn print_json(result: &LastResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
