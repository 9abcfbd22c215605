//! Aggregation engine
//!
//! The [`Aggregator`] is responsible for:
//! - Fanning a refresh cycle out across every provider
//! - Refreshing each provider before resolving it
//! - Joining every provider task before returning
//! - Flattening all registries into a snapshot for output
//!
//! ## Architecture
//!
//! ```text
//!                      ┌──────────────┐
//!                      │  Aggregator  │
//!                      └──────────────┘
//!                             │ one task per provider
//!         ┌───────────────────┼───────────────────┐
//!         ▼                   ▼                   ▼
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ StaticSources │   │  FileSources  │   │ RemoteSources │
//! └───────────────┘   └───────────────┘   └───────────────┘
//!         │ refresh, then resolve (one task per source)
//!         ▼
//! ┌───────────────┐
//! │   Resolver    │
//! └───────────────┘
//! ```
//!
//! The [`RefreshScheduler`] drives the aggregator on a fixed interval in live
//! mode.

pub mod scheduler;

pub use scheduler::{RefreshScheduler, SchedulerEvent, SchedulerState};

use crate::providers::SourceProvider;
use crate::source::Source;
use crate::traits::Resolver;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Summary of one refresh cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Providers visited
    pub providers: usize,
    /// Providers whose refresh failed (registry kept at prior state)
    pub refresh_failures: usize,
    /// Sources held across all providers after the cycle
    pub sources: usize,
    /// Sources resolved this cycle
    pub resolved: usize,
    /// Sources whose resolution failed this cycle
    pub failed: usize,
}

/// Fans refresh and resolve out across a fixed set of providers
///
/// The aggregator never mutates a source itself; it only invokes provider
/// operations and reads snapshots.
pub struct Aggregator {
    providers: Vec<Arc<SourceProvider>>,
    resolver: Arc<dyn Resolver>,
}

impl Aggregator {
    /// Create an aggregator over the given providers
    pub fn new(providers: Vec<SourceProvider>, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            providers: providers.into_iter().map(Arc::new).collect(),
            resolver,
        }
    }

    pub fn providers(&self) -> &[Arc<SourceProvider>] {
        &self.providers
    }

    /// Total number of sources across all providers
    pub fn source_count(&self) -> usize {
        self.providers.iter().map(|p| p.len()).sum()
    }

    /// Run one refresh cycle
    ///
    /// Every provider gets its own task which refreshes and then resolves.
    /// Returns once all tasks have finished. Per-provider failures are logged
    /// where they occur and never abort a sibling.
    pub async fn refresh_and_resolve(&self) -> CycleReport {
        let mut tasks = JoinSet::new();

        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let resolver = Arc::clone(&self.resolver);

            tasks.spawn(async move {
                let refreshed = provider.refresh_sources().await;
                let report = provider.resolve_sources(resolver).await;
                (refreshed, report)
            });
        }

        let mut cycle = CycleReport {
            providers: self.providers.len(),
            ..CycleReport::default()
        };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((refreshed, report)) => {
                    if !refreshed {
                        cycle.refresh_failures += 1;
                    }
                    cycle.resolved += report.resolved;
                    cycle.failed += report.failed;
                }
                Err(e) => {
                    error!("Provider task aborted: {}", e);
                    cycle.refresh_failures += 1;
                }
            }
        }

        cycle.sources = self.source_count();

        info!(
            "Refresh cycle done: {} provider(s), {} source(s), {} resolved, {} failed",
            cycle.providers, cycle.sources, cycle.resolved, cycle.failed
        );

        cycle
    }

    /// Flatten every provider's registry into one sequence
    ///
    /// Order is unspecified and may vary between calls.
    pub fn snapshot(&self) -> Vec<Source> {
        let mut sources = Vec::with_capacity(self.source_count());
        for provider in &self.providers {
            provider.iterate(|source| sources.push(source.clone()));
        }
        sources
    }
}
