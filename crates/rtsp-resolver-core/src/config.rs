//! Configuration types for the resolver system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Redirect resolution configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Overall deadline for one resolution, covering every redirect hop
    #[serde(default = "default_resolve_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of redirects followed before giving up
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// User-Agent header sent with each request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Resolve timeout must be > 0"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(crate::Error::config("User-Agent cannot be empty"));
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_resolve_timeout_secs(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
        }
    }
}

/// Remote source list fetch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Deadline for one HTTP GET of a remote source list
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the fetch configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Fetch timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// Live endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Address to bind the endpoint on
    #[serde(default = "default_bind_host")]
    pub host: String,

    /// TCP port of the endpoint
    pub port: u16,

    /// Seconds between refresh cycles
    pub interval_secs: u64,
}

impl LiveConfig {
    pub fn new(port: u16, interval_secs: u64) -> Self {
        Self {
            host: default_bind_host(),
            port,
            interval_secs,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// `host:port` string suitable for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate the live endpoint configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Refresh interval must be > 0"));
        }
        if self.host.is_empty() {
            return Err(crate::Error::config("Bind host cannot be empty"));
        }
        Ok(())
    }
}

/// Encoding of a local source list file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// JSON array of address strings
    Json,
    /// CSV rows, address in the first column
    Csv,
}

impl FileFormat {
    /// Detect the format from the file extension
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        match path.as_ref().extension()?.to_str()? {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Source provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Fixed list of addresses
    Static {
        /// Stream addresses
        addresses: Vec<String>,
    },

    /// Local file holding a list of addresses
    File {
        /// Path to the file
        path: PathBuf,
        /// File encoding
        format: FileFormat,
    },

    /// HTTP endpoint returning a JSON array of addresses
    Remote {
        /// Endpoint URL
        url: String,
    },
}

impl ProviderConfig {
    /// Classify a command-line source argument
    ///
    /// Precedence: `http*` URL, `*.json` file, `rtsp*` address, `*.csv` file.
    pub fn from_argument(argument: &str) -> Result<Self, crate::Error> {
        if argument.starts_with("http") {
            Ok(Self::Remote {
                url: argument.to_string(),
            })
        } else if argument.ends_with(".json") {
            Ok(Self::File {
                path: PathBuf::from(argument),
                format: FileFormat::Json,
            })
        } else if argument.starts_with("rtsp") {
            Ok(Self::Static {
                addresses: vec![argument.to_string()],
            })
        } else if argument.ends_with(".csv") {
            Ok(Self::File {
                path: PathBuf::from(argument),
                format: FileFormat::Csv,
            })
        } else {
            Err(crate::Error::config(format!(
                "Unsupported source: {}",
                argument
            )))
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Static { addresses } => {
                if addresses.iter().any(|a| a.is_empty()) {
                    return Err(crate::Error::config("Static address cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::File { path, .. } => {
                if path.as_os_str().is_empty() {
                    return Err(crate::Error::config("Source file path cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Remote { url } => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(crate::Error::config(format!(
                        "Remote source must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ProviderConfig::Static { .. } => "static",
            ProviderConfig::File { .. } => "file",
            ProviderConfig::Remote { .. } => "remote",
        }
    }
}

fn default_resolve_timeout_secs() -> u64 {
    15
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("rtsp-resolver/{}", env!("CARGO_PKG_VERSION"))
}

fn default_fetch_timeout_secs() -> u64 {
    5
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}
