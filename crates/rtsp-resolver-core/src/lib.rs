// # rtsp-resolver-core
//
// Core library for aggregating stream addresses and resolving them to their
// final destination.
//
// ## Architecture Overview
//
// - **Source**: An (original, resolved) address pair
// - **SourceRegistry**: Lock-guarded map of sources keyed by original address
// - **SourceProvider**: Static list, local file or remote endpoint owning one registry
// - **Resolver**: Trait for discovering the final address of a stream
// - **Aggregator**: Fans a refresh + resolve cycle out across all providers
// - **RefreshScheduler**: Drives the aggregator on a fixed interval
//
// ## Design Principles
//
// 1. **Contained Failures**: A failing provider or source never aborts its siblings
// 2. **Stage Then Merge**: Resolution results are staged and merged in one lock
// 3. **No Lock Across I/O**: The registry lock is never held across a network call
// 4. **Library-First**: The daemon is a thin layer over this crate

pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod providers;
pub mod registry;
pub mod source;
pub mod traits;

// Re-export core types for convenience
pub use config::{FetchConfig, FileFormat, LiveConfig, ProviderConfig, ResolverConfig};
pub use engine::{Aggregator, CycleReport, RefreshScheduler, SchedulerEvent, SchedulerState};
pub use error::{Error, Result};
pub use output::{OutputFormat, write_snapshot};
pub use providers::{FileSources, RemoteSources, SourceProvider, StaticSources};
pub use registry::{ResolveReport, SourceRegistry};
pub use source::Source;
pub use traits::Resolver;
