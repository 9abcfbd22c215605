// # rtsp-resolverd - RTSP Redirect Resolver
//
// Thin integration layer over rtsp-resolver-core. Resolution, refresh and
// scheduling logic all live in the libraries; this binary only:
// 1. Parses the command line
// 2. Initializes logging and the runtime
// 3. Builds one provider per SOURCE argument
// 4. Runs a one-shot resolution or the live endpoint
//
// ## Usage
//
// ```bash
// rtsp-resolverd <MODE> <SOURCE>...
// ```
//
// MODE is one of:
// - `args`: resolved addresses on stdout, space separated
// - `nl`: resolved addresses on stdout, one per line
// - `json`: `redirect_sources.json` in `--output-dir`
// - `csv`: `redirect_sources.csv` in `--output-dir`
// - `http:<port>:<interval>`: serve the mapping on `GET /`, refreshing every
//   `<interval>` seconds until SIGTERM or SIGINT
//
// SOURCE is an `rtsp://` or `rtsps://` address (credentials in the userinfo
// are used when the server asks for them), a `.json` or `.csv` file, or an
// http(s) endpoint returning a JSON array of addresses.
//
// Any path of the live endpoint answers with the mapping.
//
// Logs go to stderr. Level: `--log-level` or `RTSP_RESOLVER_LOG_LEVEL`.

mod cli;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Mode};
use rtsp_resolver_core::{
    Aggregator, FetchConfig, LiveConfig, OutputFormat, RefreshScheduler, SchedulerEvent,
    Source, SourceProvider, write_snapshot,
};
use rtsp_resolver_describe::RtspResolver;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy)]
enum ResolverExitCode {
    /// Output written, or clean shutdown of the live endpoint
    Success = 0,
    /// Runtime failure (bind error, unwritable output, runtime setup)
    RuntimeError = 1,
    /// Malformed mode, parameters or configuration
    UsageError = 2,
}

impl From<ResolverExitCode> for ExitCode {
    fn from(code: ResolverExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // clap exits with status 2 and a usage hint on malformed arguments
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ResolverExitCode::RuntimeError.into();
    }

    let (resolver_config, fetch_config) = match (cli.resolver_config(), cli.fetch_config()) {
        (Ok(resolver), Ok(fetch)) => (resolver, fetch),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Configuration error: {}", e);
            return ResolverExitCode::UsageError.into();
        }
    };

    let resolver = match RtspResolver::new(resolver_config) {
        Ok(resolver) => Arc::new(resolver),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ResolverExitCode::UsageError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ResolverExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let providers = build_providers(&cli, &fetch_config)?;
        let aggregator = Arc::new(Aggregator::new(providers, resolver));

        match cli.mode {
            Mode::OneShot(format) => run_once(format, &aggregator, &cli.output_dir).await,
            Mode::Live(ref live) => run_live(live, aggregator).await,
        }
    });

    match result {
        Ok(()) => ResolverExitCode::Success.into(),
        Err(e) => {
            error!("{:#}", e);
            ResolverExitCode::RuntimeError.into()
        }
    }
}

/// One provider per usable SOURCE argument
fn build_providers(cli: &Cli, fetch: &FetchConfig) -> Result<Vec<SourceProvider>> {
    let providers = cli
        .provider_configs()
        .iter()
        .map(|config| {
            SourceProvider::from_config(config, fetch)
                .with_context(|| format!("Failed to create {} provider", config.type_name()))
        })
        .collect::<Result<Vec<_>>>()?;

    if providers.is_empty() {
        warn!("No usable sources given; output will be empty");
    }
    for provider in &providers {
        debug!("Configured provider {}", provider);
    }

    Ok(providers)
}

/// Resolve every source once and write the result
async fn run_once(format: OutputFormat, aggregator: &Aggregator, output_dir: &Path) -> Result<()> {
    aggregator.refresh_and_resolve().await;
    let snapshot = aggregator.snapshot();

    match format.file_name() {
        None => {
            let stdout = std::io::stdout();
            write_output(format, &snapshot, stdout.lock())?;
        }
        Some(name) => {
            let path = output_dir.join(name);
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_output(format, &snapshot, BufWriter::new(file))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} source(s) to {}", snapshot.len(), path.display());
        }
    }

    Ok(())
}

fn write_output<W: Write>(format: OutputFormat, snapshot: &[Source], mut writer: W) -> Result<()> {
    write_snapshot(format, snapshot, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Serve the mapping and keep it fresh until a shutdown signal arrives
async fn run_live(config: &LiveConfig, aggregator: Arc<Aggregator>) -> Result<()> {
    // The endpoint never serves an unresolved first snapshot
    initial_cycle(&aggregator).await;

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address()))?;

    let cancel = CancellationToken::new();
    let signal_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match wait_for_shutdown().await {
                Ok(signal) => info!("Received {}, shutting down", signal),
                Err(e) => error!("Signal handling failed, shutting down: {}", e),
            }
            cancel.cancel();
        })
    };

    let result = serve_live(listener, config.interval(), aggregator, cancel).await;
    signal_task.abort();

    let cycles = result?;
    info!("Stopped after {} refresh cycle(s)", cycles);
    Ok(())
}

async fn initial_cycle(aggregator: &Aggregator) {
    let report = aggregator.refresh_and_resolve().await;
    info!(
        "Initial cycle: {} source(s), {} resolved",
        report.sources, report.resolved
    );
}

/// Serve on `listener` and refresh every `interval` until `cancel` fires
///
/// Returns the number of refresh cycles run.
async fn serve_live(
    listener: TcpListener,
    interval: Duration,
    aggregator: Arc<Aggregator>,
    cancel: CancellationToken,
) -> Result<u64> {
    let (scheduler, mut events) = RefreshScheduler::new(Arc::clone(&aggregator), interval)?;

    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SchedulerEvent::CycleCompleted { cycle, report, finished_at } => debug!(
                    "Cycle {} finished at {}: {} resolved, {} failed",
                    cycle, finished_at, report.resolved, report.failed
                ),
                other => debug!("Scheduler event: {:?}", other),
            }
        }
    });

    let scheduler_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(cancel).await })
    };

    let served = server::serve(listener, aggregator, cancel.clone()).await;

    // A server error also stops the scheduler
    cancel.cancel();

    let cycles = scheduler_task.await.context("Scheduler task failed")?;
    let _ = event_logger.await;

    served.map(|()| cycles)
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for Ctrl-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
