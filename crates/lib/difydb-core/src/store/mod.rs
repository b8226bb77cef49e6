//! Query executor interface and implementations.
//!
//! The search core only needs "run these source queries with these parameters
//! and hand back ordered rows". `PgExecutor` does that against `PostgreSQL`
//! through `sqlx`; `MemoryExecutor` evaluates the same descriptors over
//! in-memory tables.

pub mod memory;
pub mod postgres;

use std::{error::Error, fmt, future::Future};

use difydb_store::Row;
use difydb_store::schema::SourceQuery;

pub use memory::MemoryExecutor;
pub use postgres::{PgExecutor, PgSettings};

#[derive(Debug)]
pub enum StoreError {
    Database(Box<sqlx::Error>),
    InvalidQuery(String),
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(err) => write!(f, "database error: {err}"),
            Self::InvalidQuery(message) => write!(f, "invalid query: {message}"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Database(err) => Some(err.as_ref()),
            Self::InvalidQuery(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(Box::new(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Runs read-only source queries.
pub trait QueryExecutor: Clone + Send + Sync + 'static {
    /// Executes `query` with positional `params` and returns rows in result order.
    fn fetch_all(
        &self,
        query: &SourceQuery,
        params: &[&str],
    ) -> impl Future<Output = StoreResult<Vec<Row>>> + Send;

    /// Executes `queries` in order on one acquired connection, holding it
    /// until the last query finishes. Stops at the first failure.
    fn fetch_batch(
        &self,
        queries: &[SourceQuery],
        params: &[&str],
    ) -> impl Future<Output = StoreResult<Vec<Vec<Row>>>> + Send;

    /// Releases every underlying connection.
    fn close(&self) -> impl Future<Output = ()> + Send;
}
