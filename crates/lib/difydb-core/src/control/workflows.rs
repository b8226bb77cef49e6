use std::fmt;

use difydb_store::graph::{GraphDocument, GraphParseError};
use difydb_store::schema::{
    COL_APP_ID,
    COL_APP_NAME,
    COL_GRAPH,
    COL_UPDATED_AT,
    WORKFLOW_GRAPH_QUERY,
    contains_pattern,
};
use difydb_store::{
    DbValue,
    LlmNodeMatch,
    Row,
    SearchEnvelope,
    ToolNodeMatch,
    WorkflowMatch,
};
use serde_json::Value;
use tracing::debug;

use super::{ControlError, SearchControlPlane};
use crate::matcher::{KeywordMatcher, LlmNodes, NodeTarget, ToolNodes, match_nodes};
use crate::store::QueryExecutor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingGraph,
    Malformed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingGraph => write!(f, "workflow has no graph"),
            Self::Malformed(message) => write!(f, "{message}"),
        }
    }
}

/// A workflow row left out of the results because its graph was unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSkip {
    pub app_id: String,
    pub reason: SkipReason,
}

/// Result of evaluating one workflow row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome<M> {
    Matched(WorkflowMatch<M>),
    NoMatch,
    Skipped(RowSkip),
}

/// Outcome of a graph scan over a batch of workflow rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowScan<M> {
    pub scanned: usize,
    pub matches: Vec<WorkflowMatch<M>>,
    pub skipped: Vec<RowSkip>,
}

impl<M> Default for WorkflowScan<M> {
    fn default() -> Self {
        Self {
            scanned: 0,
            matches: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Evaluates a workflow row against the keyword for node kind `T`.
#[must_use]
pub fn evaluate_workflow_row<T: NodeTarget>(
    row: &Row,
    keyword: &KeywordMatcher,
) -> RowOutcome<T::Match> {
    let app_id = text_or_empty(row.get(COL_APP_ID));
    let document = match parse_graph(row.get(COL_GRAPH)) {
        Ok(document) => document,
        Err(reason) => return RowOutcome::Skipped(RowSkip { app_id, reason }),
    };

    let matches = match_nodes::<T>(&document, keyword);
    if matches.is_empty() {
        return RowOutcome::NoMatch;
    }

    RowOutcome::Matched(WorkflowMatch {
        app_id,
        app_name: text_or_empty(row.get(COL_APP_NAME)),
        matches,
        updated_at: row
            .get(COL_UPDATED_AT)
            .filter(|value| !value.is_null())
            .map(ToString::to_string),
    })
}

/// Evaluates every row, keeping matches and skips in row order.
#[must_use]
pub fn scan_workflow_rows<T: NodeTarget>(rows: &[Row], keyword: &str) -> WorkflowScan<T::Match> {
    let matcher = KeywordMatcher::new(keyword);
    let mut scan = WorkflowScan {
        scanned: rows.len(),
        ..WorkflowScan::default()
    };
    for row in rows {
        match evaluate_workflow_row::<T>(row, &matcher) {
            RowOutcome::Matched(entry) => scan.matches.push(entry),
            RowOutcome::NoMatch => {}
            RowOutcome::Skipped(skip) => {
                debug!(app_id = %skip.app_id, reason = %skip.reason, "skipping workflow graph");
                scan.skipped.push(skip);
            }
        }
    }
    scan
}

fn parse_graph(value: Option<&DbValue>) -> Result<GraphDocument, SkipReason> {
    let parsed = match value {
        None | Some(DbValue::Null | DbValue::Json(Value::Null)) => {
            return Err(SkipReason::MissingGraph);
        }
        Some(DbValue::Text(text) | DbValue::Json(Value::String(text))) => GraphDocument::parse(text),
        Some(DbValue::Json(json)) => GraphDocument::from_value(json),
        Some(other) => {
            return Err(SkipReason::Malformed(format!(
                "unexpected graph value: {other}"
            )));
        }
    };
    parsed.map_err(|err| match err {
        GraphParseError::Empty => SkipReason::MissingGraph,
        other => SkipReason::Malformed(other.to_string()),
    })
}

fn text_or_empty(value: Option<&DbValue>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

impl<E: QueryExecutor> SearchControlPlane<E> {
    /// Runs the workflow graph query and scans the rows for node kind `T`.
    ///
    /// # Errors
    /// Returns `ControlError` if the pool cannot be opened or the query fails.
    pub async fn scan_workflows<T: NodeTarget>(
        &self,
        keyword: &str,
    ) -> Result<WorkflowScan<T::Match>, ControlError> {
        let executor = self.connections.acquire().await?;
        let pattern = contains_pattern(keyword);
        let rows = executor
            .fetch_all(&WORKFLOW_GRAPH_QUERY, &[pattern.as_str()])
            .await?;

        let scan = scan_workflow_rows::<T>(&rows, keyword);
        debug!(
            node_type = T::TYPE_NAME,
            scanned = scan.scanned,
            matched = scan.matches.len(),
            skipped = scan.skipped.len(),
            "workflow graphs scanned"
        );
        Ok(scan)
    }

    /// Finds workflows containing tool nodes whose provider or tool name
    /// contains `keyword`.
    ///
    /// # Errors
    /// Returns `ControlError` if the pool cannot be opened or the query fails.
    pub async fn search_workflows_by_plugin(
        &self,
        keyword: &str,
    ) -> Result<SearchEnvelope<Vec<WorkflowMatch<ToolNodeMatch>>>, ControlError> {
        let scan = self.scan_workflows::<ToolNodes>(keyword).await?;
        Ok(SearchEnvelope {
            summary: self.locale.plugin_workflows(scan.matches.len(), keyword),
            keyword: keyword.to_string(),
            results: scan.matches,
        })
    }

    /// Finds workflows containing LLM nodes whose model name or provider
    /// contains `keyword`.
    ///
    /// # Errors
    /// Returns `ControlError` if the pool cannot be opened or the query fails.
    pub async fn search_workflows_by_llm(
        &self,
        keyword: &str,
    ) -> Result<SearchEnvelope<Vec<WorkflowMatch<LlmNodeMatch>>>, ControlError> {
        let scan = self.scan_workflows::<LlmNodes>(keyword).await?;
        Ok(SearchEnvelope {
            summary: self.locale.llm_workflows(scan.matches.len(), keyword),
            keyword: keyword.to_string(),
            results: scan.matches,
        })
    }
}
