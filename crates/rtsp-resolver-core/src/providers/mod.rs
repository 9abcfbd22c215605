//! Source providers
//!
//! A provider is a configured origin of sources owning exactly one
//! [`SourceRegistry`]. The set of variants is closed:
//!
//! - [`StaticSources`]: fixed list, refresh is a no-op
//! - [`FileSources`]: local JSON or CSV file
//! - [`RemoteSources`]: HTTP endpoint returning a JSON array
//!
//! [`SourceProvider`] dispatches the shared capability set
//! (`refresh_sources`, `resolve_sources`, `add`, `get`, `iterate`) over them.

pub mod decode;
pub mod file;
pub mod remote;
pub mod static_list;

pub use file::FileSources;
pub use remote::RemoteSources;
pub use static_list::StaticSources;

use crate::config::{FetchConfig, ProviderConfig};
use crate::error::Result;
use crate::registry::{ResolveReport, SourceRegistry};
use crate::source::Source;
use crate::traits::Resolver;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A configured origin of sources
#[derive(Debug)]
pub enum SourceProvider {
    /// Fixed list given at construction
    Static(StaticSources),
    /// Local file re-read on every refresh
    File(FileSources),
    /// Remote endpoint fetched on every refresh
    Remote(RemoteSources),
}

impl SourceProvider {
    /// Build a provider from configuration
    pub fn from_config(config: &ProviderConfig, fetch: &FetchConfig) -> Result<Self> {
        config.validate()?;

        let provider = match config {
            ProviderConfig::Static { addresses } => {
                Self::Static(StaticSources::from_addresses(addresses.iter().cloned()))
            }
            ProviderConfig::File { path, format } => {
                Self::File(FileSources::new(path.clone(), *format))
            }
            ProviderConfig::Remote { url } => Self::Remote(RemoteSources::new(url.clone(), fetch)?),
        };

        Ok(provider)
    }

    /// Provider type name
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Static(_) => "static",
            Self::File(_) => "file",
            Self::Remote(_) => "remote",
        }
    }

    fn registry(&self) -> &SourceRegistry {
        match self {
            Self::Static(p) => p.registry(),
            Self::File(p) => p.registry(),
            Self::Remote(p) => p.registry(),
        }
    }

    /// Refresh the source set
    ///
    /// Failures are logged here and leave the registry at its prior state.
    ///
    /// # Returns
    ///
    /// `true` if the refresh succeeded
    pub async fn refresh_sources(&self) -> bool {
        let outcome = match self {
            Self::Static(p) => Ok(p.refresh_sources()),
            Self::File(p) => p.refresh_sources().await,
            Self::Remote(p) => p.refresh_sources().await,
        };

        match outcome {
            Ok(count) => {
                debug!("Refreshed {}: {} source(s)", self, count);
                true
            }
            Err(e) => {
                warn!("Failed to refresh {}: {}", self, e);
                false
            }
        }
    }

    /// Resolve every source currently held by this provider
    pub async fn resolve_sources(&self, resolver: Arc<dyn Resolver>) -> ResolveReport {
        self.registry().resolve_all(resolver).await
    }

    /// Insert or replace a source
    pub fn add(&self, source: Source) {
        self.registry().add(source);
    }

    /// Look up a source by its original address
    pub fn get(&self, original: &str) -> Option<Source> {
        self.registry().get(original)
    }

    /// Visit every source once, in no particular order
    pub fn iterate<F>(&self, visit: F)
    where
        F: FnMut(&Source),
    {
        self.registry().iterate(visit);
    }

    /// Copy of every source at this point in time
    pub fn snapshot(&self) -> Vec<Source> {
        self.registry().snapshot()
    }

    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }
}

impl fmt::Display for SourceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(p) => write!(f, "static list ({} source(s))", p.registry().len()),
            Self::File(p) => write!(f, "file {}", p.path().display()),
            Self::Remote(p) => write!(f, "remote {}", p.url()),
        }
    }
}

impl From<StaticSources> for SourceProvider {
    fn from(provider: StaticSources) -> Self {
        Self::Static(provider)
    }
}

impl From<FileSources> for SourceProvider {
    fn from(provider: FileSources) -> Self {
        Self::File(provider)
    }
}

impl From<RemoteSources> for SourceProvider {
    fn from(provider: RemoteSources) -> Self {
        Self::Remote(provider)
    }
}
