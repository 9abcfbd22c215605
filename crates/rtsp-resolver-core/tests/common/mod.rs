//! Test doubles and common utilities for contract tests
//!
//! These resolvers never touch the network; they let tests control timing
//! and outcomes of each resolution.

#![allow(dead_code)]

use rtsp_resolver_core::error::{Error, Result};
use rtsp_resolver_core::{CycleReport, Resolver, SchedulerEvent, Source};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};

/// Suffix appended by [`SuffixResolver`]
pub const RESOLVED_SUFFIX: &str = "->resolved";

/// Resolves every address to `<original>->resolved`, optionally after a delay
pub struct SuffixResolver {
    delay: Duration,
    call_count: Arc<AtomicUsize>,
}

impl SuffixResolver {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times resolve() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

pub fn expected_resolution(original: &str) -> String {
    format!("{}{}", original, RESOLVED_SUFFIX)
}

#[async_trait::async_trait]
impl Resolver for SuffixResolver {
    async fn resolve(&self, source: &Source) -> Result<Source> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(source.resolve_to(expected_resolution(source.original())))
    }

    fn resolver_name(&self) -> &'static str {
        "suffix"
    }
}

/// Resolves from a fixed table; unknown addresses fail
pub struct TableResolver {
    table: HashMap<String, String>,
}

impl TableResolver {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, &'static str)>,
    {
        Self {
            table: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl Resolver for TableResolver {
    async fn resolve(&self, source: &Source) -> Result<Source> {
        match self.table.get(source.original()) {
            Some(resolved) => Ok(source.resolve_to(resolved.clone())),
            None => Err(Error::protocol(404, "Not Found")),
        }
    }

    fn resolver_name(&self) -> &'static str {
        "table"
    }
}

/// Blocks each resolution until the test hands out a permit
pub struct GatedResolver {
    gate: Arc<Semaphore>,
    completed: Arc<AtomicUsize>,
}

impl GatedResolver {
    pub fn new() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let resolver = Self {
            gate: Arc::clone(&gate),
            completed: Arc::new(AtomicUsize::new(0)),
        };
        (resolver, gate)
    }

    /// Number of resolutions that have returned
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Resolver for GatedResolver {
    async fn resolve(&self, source: &Source) -> Result<Source> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| Error::malformed("gate closed"))?;
        permit.forget();

        let resolved = source.resolve_to(expected_resolution(source.original()));
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(resolved)
    }

    fn resolver_name(&self) -> &'static str {
        "gated"
    }
}

/// Wait for the next `CycleCompleted` event, skipping others
pub async fn next_completed_cycle(
    events: &mut mpsc::Receiver<SchedulerEvent>,
) -> (u64, CycleReport) {
    tokio::time::timeout(Duration::from_secs(20), async {
        loop {
            match events.recv().await {
                Some(SchedulerEvent::CycleCompleted { cycle, report, .. }) => {
                    return (cycle, report);
                }
                Some(_) => continue,
                None => panic!("scheduler event channel closed"),
            }
        }
    })
    .await
    .expect("refresh cycle completes in time")
}

/// Sort a snapshot by original address for comparisons
pub fn sorted(mut sources: Vec<Source>) -> Vec<Source> {
    sources.sort_by(|a, b| a.original().cmp(b.original()));
    sources
}
