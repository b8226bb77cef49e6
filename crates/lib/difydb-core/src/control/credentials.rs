use difydb_store::schema::{CREDENTIAL_QUERIES, contains_pattern};
use difydb_store::{SearchEnvelope, SourceResults};
use tracing::debug;

use super::{ControlError, SearchControlPlane};
use crate::normalize::normalize_rows;
use crate::store::QueryExecutor;

impl<E: QueryExecutor> SearchControlPlane<E> {
    /// Searches model credentials, tool provider credentials, and workflow
    /// environment variables for `keyword`, all on one connection.
    ///
    /// # Errors
    /// Returns `ControlError` if the pool cannot be opened or any source query
    /// fails; partial results are discarded.
    pub async fn search_dify_credentials(
        &self,
        keyword: &str,
    ) -> Result<SearchEnvelope<SourceResults>, ControlError> {
        let executor = self.connections.acquire().await?;
        let pattern = contains_pattern(keyword);

        let batches = executor
            .fetch_batch(&CREDENTIAL_QUERIES, &[pattern.as_str()])
            .await?;

        let mut results = SourceResults::new();
        for (query, rows) in CREDENTIAL_QUERIES.iter().zip(&batches) {
            debug!(source = query.source, rows = rows.len(), "credential source searched");
            results.push(query.source, normalize_rows(rows, query.projection));
        }

        let summary = results
            .iter()
            .map(|entry| self.locale.source_count(&entry.source, entry.rows.len()))
            .collect::<Vec<_>>()
            .join(" | ");

        Ok(SearchEnvelope {
            summary,
            keyword: keyword.to_string(),
            results,
        })
    }
}
