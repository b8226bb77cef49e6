//! Daemon entry point for the Dify database search MCP server.
//!
//! Loads configuration from flags and the environment, prepares the lazily
//! opened `PostgreSQL` pool, and serves MCP over streamable HTTP or stdio.

mod config;
mod pool;

use std::future::Future;
use std::io;

use difydb_core::control::SearchControlPlane;
use difydb_mcp::DifyDbMcp;
use difydb_mcp::server::{McpHttpServerConfig, serve_stdio, serve_streamable_http};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::DifyDbConfig;
use crate::pool::build_connections;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the stdio transport
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Resolves when either source fires. A source that failed to register is
/// logged and never fires, so it cannot stop the server by itself.
async fn wait_for_shutdown(
    ctrl_c: impl Future<Output = io::Result<()>>,
    terminate: impl Future<Output = io::Result<()>>,
) {
    let ctrl_c = async {
        if let Err(err) = ctrl_c.await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    let terminate = async {
        if let Err(err) = terminate.await {
            error!(error = %err, "failed to listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown requested");
}

#[cfg(unix)]
async fn sigterm() -> io::Result<()> {
    let mut signal = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    signal.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn sigterm() -> io::Result<()> {
    std::future::pending().await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging();
    let config = DifyDbConfig::from_args()?;
    info!(
        host = %config.database.host,
        port = config.database.port,
        database = %config.database.database,
        "difydb-mcpd starting"
    );

    let connections = build_connections(&config);
    let control =
        SearchControlPlane::new(connections.clone()).with_locale(config.summary_locale);
    let server = DifyDbMcp::new(control).with_query_timeout(config.query_timeout);

    let served = if config.enable_stdio {
        serve_stdio(server).await
    } else {
        let http = McpHttpServerConfig::new(config.http_addr)
            .with_api_key(config.api_key.as_deref());
        serve_streamable_http(server, &http, wait_for_shutdown(signal::ctrl_c(), sigterm())).await
    };

    connections.close().await;
    info!("difydb-mcpd stopped");
    served
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn failed_signal_registration_does_not_stop_server() {
        let broken = async { Err(io::Error::other("no signal handler")) };
        let waiting = wait_for_shutdown(broken, std::future::pending());

        let outcome = tokio::time::timeout(Duration::from_millis(50), waiting).await;
        assert!(outcome.is_err(), "shutdown should still be pending");
    }

    #[tokio::test]
    async fn terminate_signal_stops_server() {
        let terminate = async { Ok(()) };
        tokio::time::timeout(
            Duration::from_secs(1),
            wait_for_shutdown(std::future::pending(), terminate),
        )
        .await
        .expect("shutdown should resolve");
    }
}
