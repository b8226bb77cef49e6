use difydb_core::store::QueryExecutor;
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::DifyDbMcp;
use crate::helpers;

/// Parameters for the credential search.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchCredentialsParams {
    /// Substring to look for, e.g. part of an API key or a credential name.
    pub keyword: String,
}

/// Parameters for the workflow tool-node search.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PluginSearchParams {
    /// Substring of a plugin provider id or tool name, e.g. `google`.
    pub plugin_keyword: String,
}

/// Parameters for the workflow LLM-node search.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LlmSearchParams {
    /// Substring of a model name or provider, e.g. `gpt-4` or `anthropic`.
    pub model_keyword: String,
}

#[tool_router(router = tool_router_search, vis = "pub")]
impl<E: QueryExecutor> DifyDbMcp<E> {
    #[tool(
        description = "Fuzzy-search model credentials, built-in tool credentials, and workflow environment variables for a keyword. Returns per-source row lists."
    )]
    async fn search_dify_credentials(
        &self,
        Parameters(params): Parameters<SearchCredentialsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        debug!(keyword = %params.keyword, "search_dify_credentials");
        let envelope = self
            .bounded(
                "search_dify_credentials",
                self.control.search_dify_credentials(&params.keyword),
            )
            .await?;
        helpers::envelope_result(&envelope)
    }

    #[tool(
        description = "Find workflows whose tool (plugin) nodes have a provider_id or tool_name containing the keyword."
    )]
    async fn search_workflows_by_plugin(
        &self,
        Parameters(params): Parameters<PluginSearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        debug!(keyword = %params.plugin_keyword, "search_workflows_by_plugin");
        let envelope = self
            .bounded(
                "search_workflows_by_plugin",
                self.control.search_workflows_by_plugin(&params.plugin_keyword),
            )
            .await?;
        helpers::envelope_result(&envelope)
    }

    #[tool(
        description = "Find workflows whose LLM nodes use a model name or provider containing the keyword."
    )]
    async fn search_workflows_by_llm(
        &self,
        Parameters(params): Parameters<LlmSearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        debug!(keyword = %params.model_keyword, "search_workflows_by_llm");
        let envelope = self
            .bounded(
                "search_workflows_by_llm",
                self.control.search_workflows_by_llm(&params.model_keyword),
            )
            .await?;
        helpers::envelope_result(&envelope)
    }
}
