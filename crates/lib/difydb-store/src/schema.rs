pub const TABLE_PROVIDER_MODEL_CREDENTIALS: &str = "provider_model_credentials";
pub const TABLE_TOOL_BUILTIN_PROVIDERS: &str = "tool_builtin_providers";
pub const TABLE_WORKFLOWS: &str = "workflows";
pub const TABLE_APPS: &str = "apps";

pub const COL_APP_ID: &str = "app_id";
pub const COL_APP_NAME: &str = "app_name";
pub const COL_GRAPH: &str = "graph";
pub const COL_UPDATED_AT: &str = "updated_at";

pub const NODE_TYPE_TOOL: &str = "tool";
pub const NODE_TYPE_LLM: &str = "llm";

/// Maximum rows returned by any single source query.
pub const SEARCH_LIMIT: usize = 50;

/// Describes one keyword query against a single source table.
///
/// `sql` is the statement sent to `PostgreSQL` with the `%keyword%` pattern
/// bound as `$1`. The remaining fields describe the same query structurally
/// so executors without a SQL engine can evaluate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceQuery {
    /// Source name, also the key used in result envelopes.
    pub source: &'static str,
    pub sql: &'static str,
    /// Columns returned for every row, in output order.
    pub projection: &'static [&'static str],
    /// Columns matched case-insensitively against the pattern; any match wins.
    pub match_columns: &'static [&'static str],
    /// When set, only the most recently updated row per distinct value is kept.
    pub distinct_on: Option<&'static str>,
    /// Left-joins `apps.name` as `app_name` on `apps.id = app_id`.
    pub join_app_name: bool,
    pub limit: usize,
}

pub const PROVIDER_MODEL_CREDENTIALS_QUERY: SourceQuery = SourceQuery {
    source: TABLE_PROVIDER_MODEL_CREDENTIALS,
    sql: r"SELECT provider_name, model_name, model_type, encrypted_config,
       created_at, updated_at
FROM provider_model_credentials
WHERE encrypted_config ILIKE $1 OR credential_name ILIKE $1
ORDER BY updated_at DESC
LIMIT 50",
    projection: &[
        "provider_name",
        "model_name",
        "model_type",
        "encrypted_config",
        "created_at",
        "updated_at",
    ],
    match_columns: &["encrypted_config", "credential_name"],
    distinct_on: None,
    join_app_name: false,
    limit: SEARCH_LIMIT,
};

pub const TOOL_BUILTIN_PROVIDERS_QUERY: SourceQuery = SourceQuery {
    source: TABLE_TOOL_BUILTIN_PROVIDERS,
    sql: r"SELECT provider, encrypted_credentials,
       created_at, updated_at
FROM tool_builtin_providers
WHERE encrypted_credentials ILIKE $1
ORDER BY updated_at DESC
LIMIT 50",
    projection: &["provider", "encrypted_credentials", "created_at", "updated_at"],
    match_columns: &["encrypted_credentials"],
    distinct_on: None,
    join_app_name: false,
    limit: SEARCH_LIMIT,
};

pub const WORKFLOW_ENVIRONMENT_QUERY: SourceQuery = SourceQuery {
    source: TABLE_WORKFLOWS,
    sql: r"SELECT DISTINCT ON (w.app_id)
       w.app_id, w.environment_variables,
       w.created_at, w.updated_at
FROM workflows w
WHERE w.environment_variables ILIKE $1
ORDER BY w.app_id, w.updated_at DESC
LIMIT 50",
    projection: &["app_id", "environment_variables", "created_at", "updated_at"],
    match_columns: &["environment_variables"],
    distinct_on: Some(COL_APP_ID),
    join_app_name: false,
    limit: SEARCH_LIMIT,
};

pub const WORKFLOW_GRAPH_QUERY: SourceQuery = SourceQuery {
    source: TABLE_WORKFLOWS,
    sql: r"SELECT DISTINCT ON (w.app_id)
       w.app_id,
       a.name AS app_name,
       w.graph,
       w.created_at,
       w.updated_at
FROM workflows w
LEFT JOIN apps a ON a.id = w.app_id
WHERE w.graph ILIKE $1
ORDER BY w.app_id, w.updated_at DESC
LIMIT 50",
    projection: &["app_id", "app_name", "graph", "created_at", "updated_at"],
    match_columns: &[COL_GRAPH],
    distinct_on: Some(COL_APP_ID),
    join_app_name: true,
    limit: SEARCH_LIMIT,
};

/// Queries run by the credential search, in output order.
pub const CREDENTIAL_QUERIES: [SourceQuery; 3] = [
    PROVIDER_MODEL_CREDENTIALS_QUERY,
    TOOL_BUILTIN_PROVIDERS_QUERY,
    WORKFLOW_ENVIRONMENT_QUERY,
];

/// Wraps a keyword as an `ILIKE` substring pattern.
///
/// The keyword is used verbatim; `%` and `_` inside it keep their pattern meaning.
#[must_use]
pub fn contains_pattern(keyword: &str) -> String {
    format!("%{keyword}%")
}
