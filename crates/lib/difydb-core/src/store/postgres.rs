use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use difydb_store::schema::SourceQuery;
use difydb_store::{DbValue, Row};
use serde_json::Value;
use sqlx::postgres::{PgColumn, PgConnectOptions, PgConnection, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row as _, TypeInfo};
use tracing::{debug, info};
use uuid::Uuid;

use super::{QueryExecutor, StoreResult};

pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the Dify `PostgreSQL` database.
#[derive(Clone)]
pub struct PgSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl PgSettings {
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            database: database.into(),
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_pool_size(mut self, min_connections: u32, max_connections: u32) -> Self {
        self.min_connections = min_connections;
        self.max_connections = max_connections;
        self
    }

    #[must_use]
    pub const fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    #[must_use]
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }

    #[must_use]
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .min_connections(self.min_connections)
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
    }
}

impl std::fmt::Debug for PgSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("min_connections", &self.min_connections)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish_non_exhaustive()
    }
}

/// Query executor backed by a `sqlx` `PostgreSQL` pool.
#[derive(Clone, Debug)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    /// Opens a pool with the configured bounds, establishing the minimum
    /// number of connections up front.
    ///
    /// # Errors
    /// Returns `StoreError` if the database cannot be reached.
    pub async fn connect(settings: &PgSettings) -> StoreResult<Self> {
        let pool = settings
            .pool_options()
            .connect_with(settings.connect_options())
            .await?;
        info!(
            host = %settings.host,
            port = settings.port,
            database = %settings.database,
            max_connections = settings.max_connections,
            "connected to postgres"
        );
        Ok(Self { pool })
    }
}

impl QueryExecutor for PgExecutor {
    async fn fetch_all(&self, query: &SourceQuery, params: &[&str]) -> StoreResult<Vec<Row>> {
        let mut connection = self.pool.acquire().await?;
        run_query(&mut connection, query, params).await
    }

    async fn fetch_batch(
        &self,
        queries: &[SourceQuery],
        params: &[&str],
    ) -> StoreResult<Vec<Vec<Row>>> {
        let mut connection = self.pool.acquire().await?;
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            results.push(run_query(&mut connection, query, params).await?);
        }
        Ok(results)
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("postgres pool closed");
    }
}

async fn run_query(
    connection: &mut PgConnection,
    query: &SourceQuery,
    params: &[&str],
) -> StoreResult<Vec<Row>> {
    let mut statement = sqlx::query(query.sql);
    for param in params {
        statement = statement.bind(*param);
    }
    let rows = statement.fetch_all(&mut *connection).await?;
    debug!(source = query.source, rows = rows.len(), "source query finished");
    rows.iter().map(decode_row).collect()
}

fn decode_row(row: &PgRow) -> StoreResult<Row> {
    row.columns()
        .iter()
        .map(|column| Ok((column.name().to_string(), decode_column(row, column)?)))
        .collect()
}

fn decode_column(row: &PgRow, column: &PgColumn) -> StoreResult<DbValue> {
    let index = column.ordinal();
    let value = match column.type_info().name() {
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(DbValue::Bool),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)?
            .map(|value| DbValue::Int(i64::from(value))),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)?
            .map(|value| DbValue::Int(i64::from(value))),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(DbValue::Int),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)?
            .map(|value| DbValue::Float(f64::from(value))),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(DbValue::Float),
        "UUID" => row.try_get::<Option<Uuid>, _>(index)?.map(DbValue::Uuid),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map(DbValue::Timestamp),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(DbValue::TimestampTz),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(index)?.map(DbValue::Json),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(index)?.map(DbValue::Text)
        }
        // Enum and domain columns arrive as text.
        _ => row
            .try_get_unchecked::<Option<String>, _>(index)?
            .map(DbValue::Text),
    };
    Ok(value.unwrap_or(DbValue::Null))
}
