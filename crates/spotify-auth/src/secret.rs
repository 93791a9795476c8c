//! Secret wrapper for credential strings

use std::fmt;
use zeroize::Zeroize;

/// Sensitive string (client secret, refresh token) - redacted in Debug/Display/logs
pub struct SecretString(String);

impl SecretString {
    /// Wrap a credential string
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the inner value (use sparingly, e.g. when building auth headers)
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the wrapped credential is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl Default for SecretString {
    fn default() -> Self {
        Self(String::new())
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_debug_and_display() {
        let secret = SecretString::new("rt_super_secret");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn exposes_value() {
        let secret = SecretString::new("client-secret-123");
        assert_eq!(secret.expose(), "client-secret-123");
        assert!(!secret.is_empty());
    }

    #[test]
    fn empty_detection() {
        assert!(SecretString::new("").is_empty());
    }
}
