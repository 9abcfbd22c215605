//! Concurrency-safe source registry
//!
//! The registry maps an original address to its [`Source`]. Every provider owns
//! exactly one registry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rtsp_resolver_core::{Source, SourceRegistry};
//!
//! let registry = SourceRegistry::new();
//! registry.add(Source::new("rtsp://cam/1"));
//!
//! // Resolve every entry concurrently, then merge the successes
//! let report = registry.resolve_all(resolver).await;
//! ```
//!
//! ## Stage Then Merge
//!
//! [`SourceRegistry::resolve_all`] never writes into the map while resolutions
//! are in flight. Successful results are collected in a staging map and merged
//! under a single lock acquisition once every attempt has finished, so readers
//! only ever see pre-resolution or fully resolved values.

use crate::source::Source;
use crate::traits::Resolver;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Outcome counters of one [`SourceRegistry::resolve_all`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Sources merged with a fresh resolved address
    pub resolved: usize,
    /// Sources left untouched because resolution failed
    pub failed: usize,
}

impl ResolveReport {
    /// Number of resolution attempts made
    pub fn attempted(&self) -> usize {
        self.resolved + self.failed
    }
}

/// Lock-guarded map from original address to source
///
/// ## Thread Safety
///
/// A single mutex guards the backing map. It is held only for map reads and
/// writes, never across an `.await`.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: Mutex<HashMap<String, Source>>,
}

impl SourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with sources
    pub fn from_sources(sources: impl IntoIterator<Item = Source>) -> Self {
        let registry = Self::new();
        registry.extend(sources);
        registry
    }

    // The map only ever holds complete values, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Source>> {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the entry keyed by `source.original()`
    pub fn add(&self, source: Source) {
        self.lock().insert(source.original().to_string(), source);
    }

    /// Insert or replace a batch of entries under one lock acquisition
    pub fn extend(&self, sources: impl IntoIterator<Item = Source>) {
        let mut guard = self.lock();
        for source in sources {
            guard.insert(source.original().to_string(), source);
        }
    }

    /// Look up a source by its original address
    pub fn get(&self, original: &str) -> Option<Source> {
        self.lock().get(original).cloned()
    }

    /// Visit every source once, in no particular order
    ///
    /// The visitor runs on a copy taken under the lock, so it may freely call
    /// back into the registry.
    pub fn iterate<F>(&self, mut visit: F)
    where
        F: FnMut(&Source),
    {
        for source in self.snapshot() {
            visit(&source);
        }
    }

    /// Copy of every entry at this point in time
    pub fn snapshot(&self) -> Vec<Source> {
        self.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Resolve every current entry concurrently and merge the successes
    ///
    /// One task is spawned per source. Failures are logged and leave the prior
    /// entry untouched; no attempt is retried.
    pub async fn resolve_all(&self, resolver: Arc<dyn Resolver>) -> ResolveReport {
        let pending = self.snapshot();
        let mut report = ResolveReport::default();

        if pending.is_empty() {
            return report;
        }

        let mut tasks = JoinSet::new();
        for source in pending {
            let resolver = Arc::clone(&resolver);
            tasks.spawn(async move {
                let outcome = resolver.resolve(&source).await;
                (source, outcome)
            });
        }

        let mut staged: HashMap<String, Source> = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((source, Ok(resolved))) => {
                    if resolved.original() != source.original() {
                        warn!(
                            "Resolver {} returned {} for {}, discarding",
                            resolver.resolver_name(),
                            resolved.original(),
                            source.original()
                        );
                        report.failed += 1;
                        continue;
                    }

                    debug!("Resolved {} -> {}", resolved.original(), resolved.resolved());
                    staged.insert(resolved.original().to_string(), resolved);
                }
                Ok((source, Err(e))) => {
                    warn!("Failed to resolve {}: {}", source.original(), e);
                    report.failed += 1;
                }
                Err(e) => {
                    error!("Resolution task aborted: {}", e);
                    report.failed += 1;
                }
            }
        }

        report.resolved = staged.len();
        self.lock().extend(staged);

        report
    }
}
