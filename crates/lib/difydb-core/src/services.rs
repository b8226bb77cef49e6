use std::error::Error;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::store::QueryExecutor;

pub type BuildExecutorFuture<E> = BoxFuture<'static, Result<E, PoolError>>;
pub type BuildExecutorFn<E> = Arc<dyn Fn() -> BuildExecutorFuture<E> + Send + Sync + 'static>;

#[derive(Debug)]
pub enum PoolError {
    BuildFailed(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildFailed(message) => write!(f, "failed to open connection pool: {message}"),
        }
    }
}

impl Error for PoolError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    Uninitialized,
    Active,
}

/// Owns the process' single query executor (connection pool).
///
/// The executor is built on first acquisition. Concurrent first acquisitions
/// wait on the same build, so at most one pool exists at a time. `close`
/// tears the pool down and returns the manager to the uninitialized state.
pub struct ConnectionManager<E: QueryExecutor> {
    inner: Arc<ConnectionManagerInner<E>>,
}

impl<E: QueryExecutor> Clone for ConnectionManager<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct ConnectionManagerInner<E> {
    state: Mutex<Option<E>>,
    build: BuildExecutorFn<E>,
}

impl<E: QueryExecutor> ConnectionManager<E> {
    #[must_use]
    pub fn new(build: BuildExecutorFn<E>) -> Self {
        Self {
            inner: Arc::new(ConnectionManagerInner {
                state: Mutex::new(None),
                build,
            }),
        }
    }

    /// Creates a manager whose builder always hands out `executor`.
    #[must_use]
    pub fn with_executor(executor: E) -> Self {
        let build: BuildExecutorFn<E> = Arc::new(move || {
            let executor = executor.clone();
            Box::pin(async move { Ok(executor) })
        });
        Self::new(build)
    }

    /// Returns the active executor, building it first if needed.
    ///
    /// # Errors
    /// Returns `PoolError` if the executor cannot be built. The manager stays
    /// uninitialized and the next call retries.
    pub async fn acquire(&self) -> Result<E, PoolError> {
        let mut state = self.inner.state.lock().await;
        if let Some(executor) = state.as_ref() {
            return Ok(executor.clone());
        }
        debug!("initializing connection pool");
        let executor = (self.inner.build)().await?;
        *state = Some(executor.clone());
        info!("connection pool ready");
        Ok(executor)
    }

    pub async fn status(&self) -> PoolStatus {
        if self.inner.state.lock().await.is_some() {
            PoolStatus::Active
        } else {
            PoolStatus::Uninitialized
        }
    }

    /// Closes the active executor, if any, and resets to uninitialized.
    pub async fn close(&self) {
        let executor = self.inner.state.lock().await.take();
        if let Some(executor) = executor {
            executor.close().await;
            info!("connection pool closed");
        }
    }
}
