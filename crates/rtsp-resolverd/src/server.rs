//! Live endpoint
//!
//! `GET /` answers with the current original -> resolved mapping, read from the
//! aggregator at request time. Every other path answers the same way.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rtsp_resolver_core::Aggregator;
use rtsp_resolver_core::output::to_mapping;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Router serving the live mapping
pub fn router(aggregator: Arc<Aggregator>) -> Router {
    Router::new()
        .route("/", get(current_sources))
        .fallback(current_sources)
        .with_state(aggregator)
}

async fn current_sources(State(aggregator): State<Arc<Aggregator>>) -> Json<BTreeMap<String, String>> {
    Json(to_mapping(&aggregator.snapshot()))
}

/// Serve until `cancel` fires; in-flight responses are allowed to finish
pub async fn serve(
    listener: TcpListener,
    aggregator: Arc<Aggregator>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    info!("Serving live sources on http://{}", listener.local_addr()?);

    axum::serve(listener, router(aggregator))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    info!("Live endpoint stopped");
    Ok(())
}
