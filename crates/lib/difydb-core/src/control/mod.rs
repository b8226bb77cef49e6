use std::{error::Error, fmt};

use crate::services::{ConnectionManager, PoolError};
use crate::store::{QueryExecutor, StoreError};

pub mod credentials;
pub mod summary;
pub mod workflows;

pub use summary::SummaryLocale;
pub use workflows::{RowOutcome, RowSkip, SkipReason, WorkflowScan};

#[derive(Debug)]
pub enum ControlError {
    Pool(PoolError),
    Store(StoreError),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pool(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ControlError {}

impl From<PoolError> for ControlError {
    fn from(err: PoolError) -> Self {
        Self::Pool(err)
    }
}

impl From<StoreError> for ControlError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Runs keyword searches against the Dify database.
pub struct SearchControlPlane<E: QueryExecutor> {
    connections: ConnectionManager<E>,
    locale: SummaryLocale,
}

impl<E: QueryExecutor> Clone for SearchControlPlane<E> {
    fn clone(&self) -> Self {
        Self {
            connections: self.connections.clone(),
            locale: self.locale,
        }
    }
}

impl<E: QueryExecutor> SearchControlPlane<E> {
    #[must_use]
    pub fn new(connections: ConnectionManager<E>) -> Self {
        Self {
            connections,
            locale: SummaryLocale::default(),
        }
    }

    /// Creates a control plane over an already open executor.
    #[must_use]
    pub fn with_executor(executor: E) -> Self {
        Self::new(ConnectionManager::with_executor(executor))
    }

    #[must_use]
    pub const fn with_locale(mut self, locale: SummaryLocale) -> Self {
        self.locale = locale;
        self
    }
}
