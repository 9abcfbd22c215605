//! Source value type
//!
//! A [`Source`] pairs the address a provider handed us with the address it
//! finally resolved to. The original address is the identity key; no
//! normalization is applied.

use serde::{Deserialize, Serialize};

/// An (original, resolved) stream address pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    original: String,
    #[serde(default)]
    resolved: String,
}

impl Source {
    /// Create an unresolved source
    pub fn new(original: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            resolved: String::new(),
        }
    }

    /// Create a source with both halves known
    pub fn with_resolved(original: impl Into<String>, resolved: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            resolved: resolved.into(),
        }
    }

    /// The address as given by the provider
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The final address, empty until a resolution succeeds
    pub fn resolved(&self) -> &str {
        &self.resolved
    }

    pub fn is_resolved(&self) -> bool {
        !self.resolved.is_empty()
    }

    /// Same original, new resolved address
    pub fn resolve_to(&self, resolved: impl Into<String>) -> Self {
        Self::with_resolved(self.original.clone(), resolved)
    }
}
