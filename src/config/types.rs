use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Number of reusable invocation workers (default: 4).
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    #[serde(default)]
    pub host: HostConfig,
}

/// Settings for the interactive host surface handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Host name reported to the engine.
    #[serde(default = "default_host_name")]
    pub name: String,
    /// Prompt text used when the engine reads a bare line.
    #[serde(default = "default_read_line_prompt")]
    pub read_line_prompt: String,
    /// Appended to a choice prompt's caption and message.
    #[serde(default = "default_choice_prompt_suffix")]
    pub choice_prompt_suffix: String,
    #[serde(default = "default_warning_prefix")]
    pub warning_prefix: String,
    #[serde(default = "default_debug_prefix")]
    pub debug_prefix: String,
    #[serde(default = "default_verbose_prefix")]
    pub verbose_prefix: String,
}

fn default_worker_threads() -> usize {
    4
}

fn default_host_name() -> String {
    "HostBridge".to_string()
}

fn default_read_line_prompt() -> String {
    "Input required:".to_string()
}

fn default_choice_prompt_suffix() -> String {
    " (enter choice index)".to_string()
}

fn default_warning_prefix() -> String {
    "[WARN] ".to_string()
}

fn default_debug_prefix() -> String {
    "[DEBUG] ".to_string()
}

fn default_verbose_prefix() -> String {
    "[VERBOSE] ".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            host: HostConfig::default(),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            name: default_host_name(),
            read_line_prompt: default_read_line_prompt(),
            choice_prompt_suffix: default_choice_prompt_suffix(),
            warning_prefix: default_warning_prefix(),
            debug_prefix: default_debug_prefix(),
            verbose_prefix: default_verbose_prefix(),
        }
    }
}
