use std::fmt;

const REDACTED: &str = "****";

/// Character buffer for secret input.
///
/// Never prints its contents through `Debug` and wipes its buffer on drop.
#[derive(Clone, Default)]
pub struct SecureString {
    chars: Vec<char>,
}

impl SecureString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from plain text, one character at a time.
    pub fn from_plain(text: &str) -> Self {
        let mut secure = Self::new();
        for c in text.chars() {
            secure.append_char(c);
        }
        secure
    }

    pub fn append_char(&mut self, c: char) {
        self.chars.push(c);
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Copy the secret out as plain text.
    pub fn reveal(&self) -> String {
        self.chars.iter().collect()
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureString({REDACTED})")
    }
}

impl Drop for SecureString {
    fn drop(&mut self) {
        for c in self.chars.iter_mut() {
            // SAFETY: `c` is a valid, aligned, exclusive reference into the buffer.
            unsafe { std::ptr::write_volatile(c, '\0') };
        }
    }
}

/// User name plus secret password returned by a credential prompt.
#[derive(Debug, Clone)]
pub struct Credential {
    pub user_name: String,
    pub password: SecureString,
}

impl Credential {
    pub fn new(user_name: impl Into<String>, password: SecureString) -> Self {
        Self {
            user_name: user_name.into(),
            password,
        }
    }
}
