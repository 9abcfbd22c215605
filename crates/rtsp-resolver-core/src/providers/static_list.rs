//! Static-list provider
//!
//! Holds the sources given at construction, typically a single stream address
//! passed on the command line. Refreshing never changes the set.

use crate::registry::SourceRegistry;
use crate::source::Source;

/// Provider over a fixed list of sources
#[derive(Debug, Default)]
pub struct StaticSources {
    registry: SourceRegistry,
}

impl StaticSources {
    /// Create a provider seeded with the given sources
    pub fn new(sources: impl IntoIterator<Item = Source>) -> Self {
        Self {
            registry: SourceRegistry::from_sources(sources),
        }
    }

    /// Create a provider from bare addresses
    pub fn from_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(addresses.into_iter().map(Source::new))
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// No-op: the source set is fixed at construction
    pub fn refresh_sources(&self) -> usize {
        self.registry.len()
    }
}
