//! MCP server runners for difydb-mcp.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use difydb_core::store::QueryExecutor;
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig,
    StreamableHttpService,
    session::local::LocalSessionManager,
};
use tracing::info;

use crate::DifyDbMcp;
use crate::auth::{ApiKeyAuth, require_api_key};

/// Default bind address for the HTTP transport.
pub const DEFAULT_HTTP_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 8000);

/// Configuration for the MCP streamable HTTP server.
#[derive(Debug, Clone)]
pub struct McpHttpServerConfig {
    pub addr: SocketAddr,
    pub stateful_mode: bool,
    pub sse_keep_alive: Option<Duration>,
    pub sse_retry: Option<Duration>,
    pub auth: ApiKeyAuth,
}

impl McpHttpServerConfig {
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            stateful_mode: true,
            sse_keep_alive: Some(Duration::from_secs(15)),
            sse_retry: Some(Duration::from_secs(3)),
            auth: ApiKeyAuth::default(),
        }
    }

    /// Requires `Authorization: Bearer <api_key>` on `/mcp` when a key is given.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<&str>) -> Self {
        self.auth = ApiKeyAuth::new(api_key);
        self
    }
}

impl Default for McpHttpServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HTTP_ADDR)
    }
}

/// Serves the MCP server over stdio. The API key boundary does not apply.
///
/// # Errors
/// Returns any transport or server error.
pub async fn serve_stdio<E: QueryExecutor>(
    server: DifyDbMcp<E>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (stdin, stdout) = stdio();
    info!("serving MCP over stdio");
    let running = serve_server(server, (stdin, stdout)).await?;
    let _ = running.waiting().await?;
    info!("stdio transport closed");
    Ok(())
}

/// Builds the HTTP router: an open `/health` route and the MCP service at
/// `/mcp` behind the API key boundary.
#[must_use]
pub fn http_router<E: QueryExecutor>(server: DifyDbMcp<E>, config: &McpHttpServerConfig) -> Router {
    let service: StreamableHttpService<DifyDbMcp<E>, LocalSessionManager> =
        StreamableHttpService::new(
            move || Ok(server.clone()),
            Arc::new(LocalSessionManager::default()),
            StreamableHttpServerConfig {
                sse_keep_alive: config.sse_keep_alive,
                sse_retry: config.sse_retry,
                stateful_mode: config.stateful_mode,
                ..Default::default()
            },
        );

    let mcp = Router::new()
        .nest_service("/mcp", service)
        .layer(from_fn_with_state(config.auth.clone(), require_api_key));
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(mcp)
}

/// Serves the MCP server using streamable HTTP transport until `shutdown`
/// resolves.
///
/// # Errors
/// Returns any listener or server error.
pub async fn serve_streamable_http<E, F>(
    server: DifyDbMcp<E>,
    config: &McpHttpServerConfig,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    E: QueryExecutor,
    F: Future<Output = ()> + Send + 'static,
{
    let app = http_router(server, config);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(
        addr = %config.addr,
        auth = config.auth.is_enabled(),
        "serving MCP over streamable HTTP at /mcp"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("HTTP transport stopped");
    Ok(())
}
