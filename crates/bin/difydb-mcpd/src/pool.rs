use std::sync::Arc;

use difydb_core::services::{BuildExecutorFn, ConnectionManager, PoolError};
use difydb_core::store::PgExecutor;

use crate::config::DifyDbConfig;

/// Builds the lazily connecting pool manager; nothing touches the network
/// until the first tool call.
pub fn build_connections(config: &DifyDbConfig) -> ConnectionManager<PgExecutor> {
    let settings = config.database.clone();
    let build: BuildExecutorFn<PgExecutor> = Arc::new(move || {
        let settings = settings.clone();
        Box::pin(async move {
            PgExecutor::connect(&settings)
                .await
                .map_err(map_build_error)
        })
    });
    ConnectionManager::new(build)
}

fn map_build_error(err: impl std::fmt::Display) -> PoolError {
    PoolError::BuildFailed(err.to_string())
}
