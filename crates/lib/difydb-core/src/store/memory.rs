use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};

use chrono::NaiveDateTime;
use difydb_store::schema::{COL_APP_ID, COL_APP_NAME, COL_UPDATED_AT, SourceQuery, TABLE_APPS};
use difydb_store::{DbValue, Row};
use tokio::sync::RwLock;

use super::{QueryExecutor, StoreError, StoreResult};

/// In-memory executor that evaluates `SourceQuery` descriptors.
///
/// Matching follows `ILIKE` (case-insensitive, `%` and `_` wildcards, `\`
/// escapes), ordering is `updated_at DESC` with nulls first, and `distinct_on`
/// keeps the latest row per key ordered by that key.
#[derive(Debug, Clone, Default)]
pub struct MemoryExecutor {
    inner: Arc<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    failing: RwLock<HashSet<String>>,
    calls: AtomicUsize,
    sessions: AtomicUsize,
    closed: AtomicBool,
}

impl MemoryExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, table: &str, row: Row) {
        let mut tables = self.inner.tables.write().await;
        tables.entry(table.to_string()).or_default().push(row);
    }

    /// Makes every later query against `source` fail.
    pub async fn fail_source(&self, source: &str) {
        self.inner.failing.write().await.insert(source.to_string());
    }

    /// Number of source queries received so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.inner.calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of connection checkouts so far; a batch counts once.
    #[must_use]
    pub fn sessions(&self) -> usize {
        self.inner.sessions.load(AtomicOrdering::SeqCst)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(AtomicOrdering::SeqCst)
    }
}

impl QueryExecutor for MemoryExecutor {
    async fn fetch_all(&self, query: &SourceQuery, params: &[&str]) -> StoreResult<Vec<Row>> {
        self.inner.sessions.fetch_add(1, AtomicOrdering::SeqCst);
        self.run(query, params).await
    }

    async fn fetch_batch(
        &self,
        queries: &[SourceQuery],
        params: &[&str],
    ) -> StoreResult<Vec<Vec<Row>>> {
        self.inner.sessions.fetch_add(1, AtomicOrdering::SeqCst);
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            results.push(self.run(query, params).await?);
        }
        Ok(results)
    }

    async fn close(&self) {
        self.inner.closed.store(true, AtomicOrdering::SeqCst);
    }
}

impl MemoryExecutor {
    async fn run(&self, query: &SourceQuery, params: &[&str]) -> StoreResult<Vec<Row>> {
        self.inner.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.is_closed() {
            return Err(StoreError::Unavailable("executor closed".to_string()));
        }
        if self.inner.failing.read().await.contains(query.source) {
            return Err(StoreError::Unavailable(format!(
                "source {} is failing",
                query.source
            )));
        }
        let pattern = params
            .first()
            .ok_or_else(|| StoreError::InvalidQuery("missing pattern parameter".to_string()))?;
        let pattern = LikePattern::parse(pattern);

        let tables = self.inner.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(query.source)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_any(row, query.match_columns, &pattern))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if query.join_app_name {
            let apps = tables.get(TABLE_APPS).map_or(&[][..], Vec::as_slice);
            for row in &mut rows {
                let name = app_name_for(apps, row.get(COL_APP_ID));
                row.set(COL_APP_NAME, name);
            }
        }
        drop(tables);

        if let Some(key) = query.distinct_on {
            rows.sort_by(|left, right| {
                key_text(left, key)
                    .cmp(&key_text(right, key))
                    .then_with(|| newest_first(left, right))
            });
            let mut seen = HashSet::new();
            rows.retain(|row| seen.insert(key_text(row, key)));
        } else {
            rows.sort_by(newest_first);
        }
        rows.truncate(query.limit);

        Ok(rows
            .iter()
            .map(|row| project(row, query.projection))
            .collect())
    }
}

fn matches_any(row: &Row, columns: &[&str], pattern: &LikePattern) -> bool {
    columns.iter().any(|column| {
        row.get(column)
            .filter(|value| !value.is_null())
            .is_some_and(|value| pattern.matches(&value.to_string()))
    })
}

fn app_name_for(apps: &[Row], app_id: Option<&DbValue>) -> DbValue {
    let Some(app_id) = app_id.filter(|value| !value.is_null()) else {
        return DbValue::Null;
    };
    let app_id = app_id.to_string();
    apps.iter()
        .find(|app| app.get("id").is_some_and(|id| id.to_string() == app_id))
        .and_then(|app| app.get("name").cloned())
        .unwrap_or(DbValue::Null)
}

fn key_text(row: &Row, key: &str) -> Option<String> {
    row.get(key)
        .filter(|value| !value.is_null())
        .map(ToString::to_string)
}

fn updated_at(row: &Row) -> Option<NaiveDateTime> {
    match row.get(COL_UPDATED_AT)? {
        DbValue::Timestamp(value) => Some(*value),
        DbValue::TimestampTz(value) => Some(value.naive_utc()),
        _ => None,
    }
}

/// `ORDER BY updated_at DESC`; `PostgreSQL` places nulls first in descending order.
fn newest_first(left: &Row, right: &Row) -> Ordering {
    match (updated_at(left), updated_at(right)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(left), Some(right)) => right.cmp(&left),
    }
}

fn project(row: &Row, projection: &[&str]) -> Row {
    projection
        .iter()
        .map(|column| {
            let value = row.get(column).cloned().unwrap_or(DbValue::Null);
            ((*column).to_string(), value)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LikeToken {
    AnySequence,
    AnyChar,
    Literal(char),
}

/// A case-insensitive `LIKE` pattern.
#[derive(Debug, Clone)]
struct LikePattern {
    tokens: Vec<LikeToken>,
}

impl LikePattern {
    fn parse(pattern: &str) -> Self {
        let mut tokens = Vec::new();
        let mut chars = pattern.chars().flat_map(char::to_lowercase);
        while let Some(ch) = chars.next() {
            let token = match ch {
                '%' => LikeToken::AnySequence,
                '_' => LikeToken::AnyChar,
                '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
                other => LikeToken::Literal(other),
            };
            tokens.push(token);
        }
        Self { tokens }
    }

    fn matches(&self, text: &str) -> bool {
        let text: Vec<char> = text.chars().flat_map(char::to_lowercase).collect();
        let tokens = &self.tokens;
        let (mut t, mut p) = (0, 0);
        let mut backtrack: Option<(usize, usize)> = None;

        while t < text.len() {
            match tokens.get(p) {
                Some(LikeToken::AnySequence) => {
                    backtrack = Some((p, t));
                    p += 1;
                }
                Some(LikeToken::AnyChar) => {
                    t += 1;
                    p += 1;
                }
                Some(LikeToken::Literal(ch)) if *ch == text[t] => {
                    t += 1;
                    p += 1;
                }
                _ => match backtrack {
                    Some((star, resume)) => {
                        p = star + 1;
                        t = resume + 1;
                        backtrack = Some((star, resume + 1));
                    }
                    None => return false,
                },
            }
        }
        tokens[p..].iter().all(|token| *token == LikeToken::AnySequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use difydb_store::schema::{
        PROVIDER_MODEL_CREDENTIALS_QUERY,
        TABLE_WORKFLOWS,
        WORKFLOW_GRAPH_QUERY,
        contains_pattern,
    };

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn like_pattern_handles_wildcards_and_case() {
        assert!(LikePattern::parse("%openai%").matches("sk-OpenAI-key"));
        assert!(LikePattern::parse("%%").matches(""));
        assert!(LikePattern::parse("g_t%").matches("GPT-4"));
        assert!(!LikePattern::parse("%claude%").matches("gpt-4"));
        assert!(LikePattern::parse("%a%b%").matches("xxaxxbxx"));
        assert!(!LikePattern::parse("%a%b").matches("xxaxxbxx"));
        assert!(LikePattern::parse(r"%50\%%").matches("save 50% now"));
        assert!(!LikePattern::parse(r"%50\%%").matches("save 500 now"));
    }

    #[tokio::test]
    async fn filters_orders_and_projects_rows() {
        let executor = MemoryExecutor::new();
        for (day, config) in [(1, "openai-old"), (3, "openai-new"), (2, "anthropic")] {
            executor
                .insert(
                    PROVIDER_MODEL_CREDENTIALS_QUERY.source,
                    Row::new()
                        .with("provider_name", "p")
                        .with("encrypted_config", config)
                        .with("credential_name", "c")
                        .with("updated_at", at(day)),
                )
                .await;
        }

        let pattern = contains_pattern("OPENAI");
        let rows = executor
            .fetch_all(&PROVIDER_MODEL_CREDENTIALS_QUERY, &[pattern.as_str()])
            .await
            .expect("query should succeed");

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].get("encrypted_config").and_then(DbValue::as_str),
            Some("openai-new")
        );
        assert_eq!(
            rows[0].columns().collect::<Vec<_>>(),
            PROVIDER_MODEL_CREDENTIALS_QUERY.projection.to_vec()
        );
        assert_eq!(rows[0].get("model_type"), Some(&DbValue::Null));
        assert_eq!(executor.calls(), 1);
    }

    #[tokio::test]
    async fn distinct_keeps_latest_row_and_joins_app_name() {
        let executor = MemoryExecutor::new();
        executor
            .insert(TABLE_APPS, Row::new().with("id", "app-1").with("name", "Search Bot"))
            .await;
        executor
            .insert(
                TABLE_WORKFLOWS,
                Row::new()
                    .with("app_id", "app-1")
                    .with("graph", r#"{"v":"old google"}"#)
                    .with("updated_at", at(1)),
            )
            .await;
        executor
            .insert(
                TABLE_WORKFLOWS,
                Row::new()
                    .with("app_id", "app-1")
                    .with("graph", r#"{"v":"new google"}"#)
                    .with("updated_at", at(5)),
            )
            .await;
        executor
            .insert(
                TABLE_WORKFLOWS,
                Row::new()
                    .with("app_id", "app-2")
                    .with("graph", r#"{"v":"google"}"#)
                    .with("updated_at", at(2)),
            )
            .await;

        let pattern = contains_pattern("google");
        let rows = executor
            .fetch_all(&WORKFLOW_GRAPH_QUERY, &[pattern.as_str()])
            .await
            .expect("query should succeed");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("app_id").and_then(DbValue::as_str), Some("app-1"));
        assert_eq!(
            rows[0].get("graph").and_then(DbValue::as_str),
            Some(r#"{"v":"new google"}"#)
        );
        assert_eq!(
            rows[0].get("app_name").and_then(DbValue::as_str),
            Some("Search Bot")
        );
        assert_eq!(rows[1].get("app_name"), Some(&DbValue::Null));
    }

    #[tokio::test]
    async fn batch_runs_on_one_session_and_stops_at_failure() {
        let executor = MemoryExecutor::new();
        let queries = [PROVIDER_MODEL_CREDENTIALS_QUERY, WORKFLOW_GRAPH_QUERY];

        let results = executor
            .fetch_batch(&queries, &["%x%"])
            .await
            .expect("batch should succeed");
        assert_eq!(results.len(), 2);
        assert_eq!(executor.sessions(), 1);
        assert_eq!(executor.calls(), 2);

        executor.fail_source(PROVIDER_MODEL_CREDENTIALS_QUERY.source).await;
        let result = executor.fetch_batch(&queries, &["%x%"]).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(executor.sessions(), 2);
        assert_eq!(executor.calls(), 3);
    }

    #[tokio::test]
    async fn closed_or_failing_sources_error() {
        let executor = MemoryExecutor::new();
        executor.fail_source(PROVIDER_MODEL_CREDENTIALS_QUERY.source).await;
        let result = executor
            .fetch_all(&PROVIDER_MODEL_CREDENTIALS_QUERY, &["%x%"])
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));

        executor.close().await;
        assert!(executor.is_closed());
        let result = executor.fetch_all(&WORKFLOW_GRAPH_QUERY, &["%x%"]).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));

        let missing = MemoryExecutor::new()
            .fetch_all(&WORKFLOW_GRAPH_QUERY, &[])
            .await;
        assert!(matches!(missing, Err(StoreError::InvalidQuery(_))));
    }
}
