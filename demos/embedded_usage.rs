//! Minimal embedding example for rtsp-resolver-core
//!
//! Uses the library with a custom resolver: a lookup table standing in for a
//! fleet of cameras behind a load balancer. The refresh loop is driven by the
//! application and stopped through a cancellation token.

use rtsp_resolver_core::output::to_mapping;
use rtsp_resolver_core::{
    Aggregator, Error, OutputFormat, RefreshScheduler, Resolver, Result, SchedulerEvent, Source,
    StaticSources, write_snapshot,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Resolver backed by a fixed table of edge addresses
struct EdgeTableResolver {
    edges: HashMap<String, String>,
    lookups: AtomicUsize,
}

impl EdgeTableResolver {
    fn new(edges: &[(&str, &str)]) -> Self {
        Self {
            edges: edges
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            lookups: AtomicUsize::new(0),
        }
    }

    fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Resolver for EdgeTableResolver {
    async fn resolve(&self, source: &Source) -> Result<Source> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        match self.edges.get(source.original()) {
            Some(edge) => Ok(source.resolve_to(edge.clone())),
            None => Err(Error::protocol(404, "Stream Not Found")),
        }
    }

    fn resolver_name(&self) -> &'static str {
        "edge-table"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    println!("=== Embedded rtsp-resolver-core Example ===\n");

    let resolver = Arc::new(EdgeTableResolver::new(&[
        ("rtsp://lb.local/cam1", "rtsp://edge-3.local/cam1"),
        ("rtsp://lb.local/cam2", "rtsp://edge-1.local/cam2"),
    ]));

    let aggregator = Arc::new(Aggregator::new(
        vec![
            StaticSources::from_addresses([
                "rtsp://lb.local/cam1",
                "rtsp://lb.local/cam2",
                "rtsp://lb.local/offline",
            ])
            .into(),
        ],
        resolver.clone(),
    ));

    // One-shot resolution
    let report = aggregator.refresh_and_resolve().await;
    println!(
        "Resolved {} of {} source(s), {} failed\n",
        report.resolved, report.sources, report.failed
    );

    let snapshot = aggregator.snapshot();
    write_snapshot(OutputFormat::Json, &snapshot, std::io::stdout())?;

    // Periodic refresh, stopped after two cycles
    let (scheduler, mut events) =
        RefreshScheduler::new(Arc::clone(&aggregator), Duration::from_millis(200))?;
    let cancel = CancellationToken::new();
    let runner = {
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(cancel).await })
    };

    while let Some(event) = events.recv().await {
        if let SchedulerEvent::CycleCompleted { cycle, report, .. } = event {
            println!("Cycle {}: {} resolved", cycle, report.resolved);
            if cycle == 2 {
                cancel.cancel();
            }
        }
    }

    let cycles = runner
        .await
        .map_err(|e| Error::config(format!("scheduler task failed: {}", e)))?;

    println!("\nScheduler ran {} cycle(s)", cycles);
    println!("Resolver performed {} lookup(s)", resolver.lookup_count());
    println!("Final mapping: {:?}", to_mapping(&aggregator.snapshot()));

    Ok(())
}
