use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use cloudlog_core::error::{CloudlogError, Result};
use tracing::info;

use crate::datasource::Datasource;
use crate::http;

/// Serves the query and resource API until `shutdown` resolves.
pub async fn run_http_server<F>(
    datasource: Datasource,
    addr: SocketAddr,
    request_timeout: Duration,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = http::router(datasource, request_timeout);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CloudlogError::Io(format!("bind {addr}: {e}")))?;
    let local = listener
        .local_addr()
        .map_err(|e| CloudlogError::Io(e.to_string()))?;
    info!(addr = %local, "query server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| CloudlogError::Io(format!("HTTP server failed: {e}")))
}
