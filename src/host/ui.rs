use std::collections::BTreeMap;
use std::sync::Arc;

use crate::bus::NotificationBus;
use crate::config::HostConfig;
use crate::engine::{
    ChoiceDescription, Credential, FieldDescription, HostUserInterface, SecureString,
};
use crate::host::InputHandshake;

/// Host surface handed to the engine.
///
/// Write calls become `output`/`error` notifications; warning, debug and
/// verbose lines share the output channel and are told apart by a prefix.
/// Read and prompt calls block the invocation worker on the
/// [`InputHandshake`]. That handshake is the only place a worker ever
/// suspends.
pub struct BridgeHostUi {
    bus: NotificationBus,
    handshake: Arc<InputHandshake>,
    config: HostConfig,
}

impl BridgeHostUi {
    pub fn new(bus: NotificationBus, handshake: Arc<InputHandshake>, config: HostConfig) -> Self {
        Self {
            bus,
            handshake,
            config,
        }
    }

    fn prefixed(&self, prefix: &str, text: &str) {
        self.bus.output(&format!("{prefix}{text}"));
    }
}

impl HostUserInterface for BridgeHostUi {
    fn write(&self, text: &str) {
        self.bus.output(text);
    }

    fn write_line(&self, text: &str) {
        self.bus.output(text);
    }

    fn write_error_line(&self, text: &str) {
        self.bus.error(text);
    }

    fn write_warning_line(&self, text: &str) {
        self.prefixed(&self.config.warning_prefix, text);
    }

    fn write_debug_line(&self, text: &str) {
        self.prefixed(&self.config.debug_prefix, text);
    }

    fn write_verbose_line(&self, text: &str) {
        self.prefixed(&self.config.verbose_prefix, text);
    }

    fn read_line(&self) -> String {
        self.handshake.request_input(&self.config.read_line_prompt)
    }

    fn read_line_as_secure_string(&self) -> SecureString {
        SecureString::from_plain(&self.read_line())
    }

    fn prompt(
        &self,
        caption: &str,
        message: &str,
        fields: &[FieldDescription],
    ) -> BTreeMap<String, String> {
        let mut values = BTreeMap::new();
        for field in fields {
            let prompt = format!("{caption} {message} {}", field.name);
            let value = self.handshake.request_input(prompt.trim());
            values.insert(field.name.clone(), value);
        }
        values
    }

    fn prompt_for_choice(
        &self,
        caption: &str,
        message: &str,
        choices: &[ChoiceDescription],
        default_choice: usize,
    ) -> usize {
        let prompt = format!("{caption} {message}{}", self.config.choice_prompt_suffix);
        let reply = self.handshake.request_input(&prompt);
        match parse_choice(&reply, choices.len()) {
            Some(index) => index,
            None => {
                tracing::debug!(reply = %reply, default_choice, "choice reply rejected; using default");
                default_choice
            }
        }
    }

    fn prompt_for_credential(
        &self,
        caption: &str,
        message: &str,
        _user_name: &str,
        _target_name: &str,
    ) -> Credential {
        let user = self
            .handshake
            .request_input(&format!("{caption} {message} User:"));
        let password = self
            .handshake
            .request_input(&format!("{caption} {message} Password:"));
        Credential::new(user, SecureString::from_plain(&password))
    }
}

/// A valid zero-based index below `count`, or `None`.
fn parse_choice(reply: &str, count: usize) -> Option<usize> {
    reply
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|index| usize::try_from(index).ok())
        .filter(|index| *index < count)
}
