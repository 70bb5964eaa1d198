//! File-only `tracing` setup for the bridge.
//!
//! The embedding host owns stdout and stderr, so nothing is logged unless
//! `HOSTBRIDGE_LOG` names a base path. Each process writes its own file,
//! `{base}.{unix_secs}.{pid}`, and invocation spans are logged on close with
//! their busy and idle time.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "HOSTBRIDGE_LOG";

/// Used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVE: &str = "hostbridge=info";

/// Install the file subscriber if `HOSTBRIDGE_LOG` is set.
///
/// Returns the file being written. A host may embed several bridges; only the
/// first install takes effect.
pub fn init_tracing() -> Option<PathBuf> {
    let base = std::env::var_os(LOG_ENV)?;
    let path = log_file_path(Path::new(&base), SystemTime::now(), std::process::id());

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(dir) {
            eprintln!("Warning: cannot create log directory {}: {err}", dir.display());
            return None;
        }
    }
    let file = match std::fs::File::create(&path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Warning: cannot create log file {}: {err}", path.display());
            return None;
        }
    };

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let installed = tracing_subscriber::registry()
        .with(filter())
        .with(file_layer)
        .try_init()
        .is_ok();
    if installed {
        tracing::info!(path = %path.display(), version = env!("CARGO_PKG_VERSION"), "logging started");
    }
    Some(path)
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// `{base}.{unix_secs}.{pid}`, so concurrent hosts never share a file.
pub fn log_file_path(base: &Path, started: SystemTime, pid: u32) -> PathBuf {
    let secs = started
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{secs}.{pid}"));
    PathBuf::from(name)
}
