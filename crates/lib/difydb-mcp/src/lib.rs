//! MCP server implementation for difydb-mcp.
//!
//! This crate wires the search control plane into rmcp tool handlers, guards
//! the HTTP surface with an optional bearer key, and provides the stdio and
//! streamable HTTP runners.

mod helpers;
mod tools;
pub mod auth;
pub mod server;

use std::future::Future;
use std::time::Duration;

use difydb_core::control::{ControlError, SearchControlPlane};
use difydb_core::store::QueryExecutor;
use rmcp::{ErrorData, ServerHandler, handler::server::tool::ToolRouter, tool_handler};
use rmcp::model::{ServerCapabilities, ServerInfo};

pub use tools::search::{LlmSearchParams, PluginSearchParams, SearchCredentialsParams};

/// Default upper bound for one tool invocation, pool acquisition included.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

const SERVER_INSTRUCTIONS: &str = r"difydb-mcp searches a Dify PostgreSQL database for where credentials, plugins, and models are used.

Tools:
- `search_dify_credentials(keyword)` searches model provider credentials, built-in tool provider
  credentials, and workflow environment variables. Results are grouped per source table.
- `search_workflows_by_plugin(plugin_keyword)` finds workflows whose tool nodes reference a
  matching `provider_id` or `tool_name`.
- `search_workflows_by_llm(model_keyword)` finds workflows whose LLM nodes use a matching model
  name or provider.

Notes:
- Matching is a case-insensitive substring match. Each source returns at most 50 rows.
- Only the latest version of each workflow is searched.
- Every tool returns a JSON envelope `{summary, keyword, results}`.
- The server is read-only; secrets are returned as stored (usually encrypted).";

/// MCP server wrapper around the search control plane.
#[derive(Clone)]
pub struct DifyDbMcp<E: QueryExecutor> {
    tool_router: ToolRouter<Self>,
    control: SearchControlPlane<E>,
    query_timeout: Duration,
}

impl<E: QueryExecutor> DifyDbMcp<E> {
    #[must_use]
    pub fn new(control: SearchControlPlane<E>) -> Self {
        Self {
            tool_router: Self::tool_router_search(),
            control,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// Runs a control plane call under the configured query timeout.
    pub(crate) async fn bounded<T>(
        &self,
        tool: &'static str,
        call: impl Future<Output = Result<T, ControlError>>,
    ) -> Result<T, ErrorData> {
        match tokio::time::timeout(self.query_timeout, call).await {
            Ok(result) => result.map_err(|err| helpers::map_control_err(tool, &err)),
            Err(_) => Err(helpers::timeout_err(tool, self.query_timeout)),
        }
    }
}

#[tool_handler]
impl<E: QueryExecutor> ServerHandler for DifyDbMcp<E> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
