//! Command line of `rtsp-resolverd`
//!
//! ```bash
//! # One-shot: print resolved addresses on one line
//! rtsp-resolverd args rtsp://cam1/live cams.csv http://registry/broadcasts
//!
//! # One-shot: write redirect_sources.json into /tmp
//! rtsp-resolverd json --output-dir /tmp cams.json
//!
//! # Live: serve the mapping on port 8080, refresh every 30 seconds
//! rtsp-resolverd http:8080:30 http://registry/broadcasts
//! ```

use clap::Parser;
use rtsp_resolver_core::{FetchConfig, LiveConfig, OutputFormat, ProviderConfig, ResolverConfig};
use std::path::PathBuf;
use tracing::{Level, warn};

/// What the daemon does with the resolved sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Resolve once and write the snapshot
    OneShot(OutputFormat),
    /// Serve the mapping over HTTP and refresh on an interval
    Live(LiveConfig),
}

/// Resolve RTSP stream addresses to their final redirect destinations
#[derive(Parser, Debug)]
#[command(name = "rtsp-resolverd", version)]
pub struct Cli {
    /// Output mode: args, nl, json, csv or http:<port>:<refresh_interval_seconds>
    #[arg(value_name = "MODE", value_parser = parse_mode)]
    pub mode: Mode,

    /// rtsp:// or rtsps:// addresses, .json/.csv files or http(s) list endpoints
    #[arg(value_name = "SOURCE", required = true, num_args = 1..)]
    pub sources: Vec<String>,

    /// Directory receiving redirect_sources.json / redirect_sources.csv
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        value_name = "LEVEL",
        env = "RTSP_RESOLVER_LOG_LEVEL",
        default_value = "info",
        value_parser = parse_log_level
    )]
    pub log_level: Level,

    /// Overall deadline for resolving one address, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 15)]
    pub resolve_timeout: u64,

    /// Deadline for fetching a remote source list, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 5)]
    pub fetch_timeout: u64,

    /// Redirects followed before an address is given up on
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub max_redirects: usize,
}

impl Cli {
    /// Resolver configuration from the command line
    pub fn resolver_config(&self) -> Result<ResolverConfig, rtsp_resolver_core::Error> {
        let config = ResolverConfig {
            timeout_secs: self.resolve_timeout,
            max_redirects: self.max_redirects,
            ..ResolverConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Fetch configuration from the command line
    pub fn fetch_config(&self) -> Result<FetchConfig, rtsp_resolver_core::Error> {
        let config = FetchConfig {
            timeout_secs: self.fetch_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Classify every SOURCE argument
    ///
    /// Unsupported or invalid arguments are logged and skipped.
    pub fn provider_configs(&self) -> Vec<ProviderConfig> {
        self.sources
            .iter()
            .filter_map(|argument| {
                match ProviderConfig::from_argument(argument).and_then(|config| {
                    config.validate()?;
                    Ok(config)
                }) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        warn!("Skipping source {:?}: {}", argument, e);
                        None
                    }
                }
            })
            .collect()
    }
}

/// Parse `args`, `nl`, `json`, `csv` or `http:<port>:<interval>`
fn parse_mode(value: &str) -> Result<Mode, String> {
    if let Ok(format) = value.parse::<OutputFormat>() {
        return Ok(Mode::OneShot(format));
    }

    let Some(params) = value.strip_prefix("http:") else {
        return Err(format!(
            "unknown mode {:?}; expected args, nl, json, csv or http:<port>:<interval>",
            value
        ));
    };

    let (port, interval) = params
        .split_once(':')
        .ok_or_else(|| "live mode needs http:<port>:<refresh_interval_seconds>".to_string())?;

    let port: u16 = port
        .parse()
        .map_err(|_| format!("invalid live port {:?}", port))?;
    let interval: u64 = interval
        .parse()
        .map_err(|_| format!("invalid refresh interval {:?}", interval))?;

    let config = LiveConfig::new(port, interval);
    config.validate().map_err(|e| e.to_string())?;

    Ok(Mode::Live(config))
}

fn parse_log_level(value: &str) -> Result<Level, String> {
    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(format!(
            "invalid log level {:?}; valid levels: trace, debug, info, warn, error",
            other
        )),
    }
}
