//! Job definition domain types

use serde::{Deserialize, Serialize};

/// A runnable job definition published on the platform
///
/// Immutable once fetched. Listings replace the whole collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: String,
    pub display_name: String,
}

impl JobDefinition {
    /// Build a definition, falling back to the id when no name is known
    pub fn new(id: impl Into<String>, display_name: Option<String>) -> Self {
        let id = id.into();
        let display_name = display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| id.clone());
        Self { id, display_name }
    }
}

impl std::fmt::Display for JobDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.display_name == self.id {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.display_name, self.id)
        }
    }
}
