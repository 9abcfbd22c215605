// # File Provider
//
// Reads a local JSON or CSV file of stream addresses on every refresh.
//
// ## Refresh Behavior
//
// - The whole file is read and decoded before the registry is touched
// - A read or decode failure leaves the registry exactly as it was
// - Addresses still present are re-added with an empty resolved address and
//   get re-resolved in the same cycle
// - Addresses that disappeared from the file are kept

use crate::config::FileFormat;
use crate::error::Result;
use crate::providers::decode::decode_sources;
use crate::registry::SourceRegistry;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Provider backed by a local source list file
#[derive(Debug)]
pub struct FileSources {
    path: PathBuf,
    format: FileFormat,
    registry: SourceRegistry,
}

impl FileSources {
    /// Create a file provider
    ///
    /// The file is not read until the first refresh.
    pub fn new(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            format,
            registry: SourceRegistry::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Re-read the file and add every decoded address
    ///
    /// # Returns
    ///
    /// - `Ok(usize)`: Number of addresses read
    /// - `Err(Error)`: The file could not be read or decoded; registry untouched
    pub async fn refresh_sources(&self) -> Result<usize> {
        let bytes = tokio::fs::read(&self.path).await?;
        let sources = decode_sources(self.format, &bytes)?;
        let count = sources.len();

        debug!("Read {} source(s) from {}", count, self.path.display());
        self.registry.extend(sources);

        Ok(count)
    }
}
