//! Credential domain type

use crate::error::{RelayError, Result};

/// Opaque platform API token
///
/// A credential is never empty. Its `Debug` output is redacted so it can be
/// carried through structured logs safely.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Create a credential from a raw token
    ///
    /// Surrounding whitespace is trimmed. An empty token fails with
    /// [`RelayError::Precondition`].
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let token = token.trim();
        if token.is_empty() {
            return Err(RelayError::Precondition(
                "an API token is required".to_string(),
            ));
        }
        Ok(Self(token.to_string()))
    }

    /// Get the raw token
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}
