// # Resolver Trait
//
// Defines the interface for discovering where a stream address finally leads.
//
// ## Implementations
//
// - RTSP DESCRIBE with redirect following: `rtsp-resolver-describe` crate
//
// ## Usage
//
// ```rust,ignore
// use rtsp_resolver_core::{Resolver, Source};
//
// let resolver = /* Resolver implementation */;
// let resolved = resolver.resolve(&Source::new("rtsp://cam/1")).await?;
// println!("{} -> {}", resolved.original(), resolved.resolved());
// ```

use async_trait::async_trait;

use crate::source::Source;

/// Trait for redirect resolver implementations
///
/// A resolver performs exactly one attempt per call. It never retries and never
/// touches a registry: the caller decides what to do with the result.
///
/// Implementations must be thread-safe; one instance is shared by every
/// resolution task of a refresh cycle.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve a single source
    ///
    /// # Returns
    ///
    /// - `Ok(Source)`: Same `original`, `resolved` set to the final address
    /// - `Err(Error)`: Invalid address, connection failure, timeout or protocol error
    async fn resolve(&self, source: &Source) -> Result<Source, crate::Error>;

    /// Short name used in log lines
    fn resolver_name(&self) -> &'static str;
}
