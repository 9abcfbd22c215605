// # Remote Endpoint Provider
//
// Fetches a JSON array of stream addresses over HTTP on every refresh.
//
// ## Refresh Behavior
//
// - One GET per refresh, bounded by the fetch timeout (5 seconds by default)
// - Non-success status, transport error or undecodable body: registry untouched
// - Every returned address is re-added with an empty resolved address

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::providers::decode::sources_from_json;
use crate::registry::SourceRegistry;
use tracing::debug;

/// Provider backed by a remote HTTP endpoint
#[derive(Debug)]
pub struct RemoteSources {
    url: String,
    client: reqwest::Client,
    registry: SourceRegistry,
}

impl RemoteSources {
    /// Create a remote provider
    ///
    /// # Parameters
    ///
    /// - `url`: Endpoint returning a JSON array of addresses
    /// - `fetch`: HTTP fetch settings
    pub fn new(url: impl Into<String>, fetch: &FetchConfig) -> Result<Self> {
        fetch.validate()?;

        let client = reqwest::Client::builder()
            .timeout(fetch.timeout())
            .build()?;

        Ok(Self {
            url: url.into(),
            client,
            registry: SourceRegistry::new(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Fetch the endpoint and add every returned address
    ///
    /// # Returns
    ///
    /// - `Ok(usize)`: Number of addresses fetched
    /// - `Err(Error)`: Transport, status or decode failure; registry untouched
    pub async fn refresh_sources(&self) -> Result<usize> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::http(format!("HTTP error: {}", response.status())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::http(format!("Failed to read response: {}", e)))?;

        let sources = sources_from_json(&body)?;
        let count = sources.len();

        debug!("Fetched {} source(s) from {}", count, self.url);
        self.registry.extend(sources);

        Ok(count)
    }
}
