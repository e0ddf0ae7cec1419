mod error;
#[cfg(feature = "database-postgres")]
pub mod postgres;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(test, any(feature = "database-sqlite", feature = "database-postgres")))]
pub mod tests;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::{
    config::DatabaseConfig,
    models::{ProcessedSignature, ProcessedValidation, RecordCategory, Signature, Validation},
};

/// Which of the two independently reachable databases a pool points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseRole {
    /// Live tables filled by the intake queues.
    Processing,
    /// Permanent, append-only archive tables.
    Archive,
}

impl DatabaseRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseRole::Processing => "processing",
            DatabaseRole::Archive => "archive",
        }
    }
}

/// PostgreSQL pool configuration with optional read replica.
#[cfg(feature = "database-postgres")]
#[derive(Clone)]
pub struct PgPoolPair {
    /// Primary pool for writes.
    pub write: sqlx::PgPool,
    /// Optional read replica pool. If None, reads use the write pool.
    pub read: Option<sqlx::PgPool>,
}

#[cfg(feature = "database-postgres")]
impl PgPoolPair {
    /// Get the pool to use for read operations.
    pub fn read_pool(&self) -> &sqlx::PgPool {
        self.read.as_ref().unwrap_or(&self.write)
    }

    /// Get the pool to use for write operations.
    pub fn write_pool(&self) -> &sqlx::PgPool {
        &self.write
    }
}

#[derive(Clone)]
enum PoolStorage {
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(feature = "database-postgres")]
    Postgres(PgPoolPair),
    #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
    _None(std::convert::Infallible),
}

/// Database pool supporting both SQLite and PostgreSQL.
#[derive(Clone)]
pub struct DbPool {
    inner: PoolStorage,
    role: DatabaseRole,
}

impl DbPool {
    /// Create a DbPool from an existing SQLite pool.
    /// Primarily useful for testing.
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool, role: DatabaseRole) -> Self {
        DbPool {
            inner: PoolStorage::Sqlite(pool),
            role,
        }
    }

    /// Create a DbPool from existing PostgreSQL pools.
    /// Primarily useful for testing.
    #[cfg(feature = "database-postgres")]
    pub fn from_postgres(
        write_pool: sqlx::PgPool,
        read_pool: Option<sqlx::PgPool>,
        role: DatabaseRole,
    ) -> Self {
        DbPool {
            inner: PoolStorage::Postgres(PgPoolPair {
                write: write_pool,
                read: read_pool,
            }),
            role,
        }
    }

    /// Create a database pool from configuration
    pub async fn from_config(config: &DatabaseConfig, role: DatabaseRole) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::NotConfigured),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .connect_with(
                        sqlx::sqlite::SqliteConnectOptions::new()
                            .filename(&cfg.path)
                            .create_if_missing(cfg.create_if_missing)
                            .journal_mode(if cfg.wal_mode {
                                sqlx::sqlite::SqliteJournalMode::Wal
                            } else {
                                sqlx::sqlite::SqliteJournalMode::Delete
                            })
                            .busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;

                Ok(Self::from_sqlite(pool, role))
            }
            #[cfg(feature = "database-postgres")]
            DatabaseConfig::Postgres(cfg) => {
                let ssl_mode = sqlx::postgres::PgSslMode::from(&cfg.ssl_mode);
                let write_options = cfg
                    .url
                    .parse::<sqlx::postgres::PgConnectOptions>()?
                    .ssl_mode(ssl_mode);
                let write_pool = sqlx::postgres::PgPoolOptions::new()
                    .min_connections(cfg.min_connections)
                    .max_connections(cfg.max_connections)
                    .acquire_timeout(std::time::Duration::from_secs(cfg.connect_timeout_secs))
                    .idle_timeout(std::time::Duration::from_secs(cfg.idle_timeout_secs))
                    .connect_with(write_options)
                    .await?;

                let read_pool = if let Some(read_url) = &cfg.read_url {
                    tracing::info!(role = role.as_str(), "Configuring read replica pool");
                    let read_options = read_url
                        .parse::<sqlx::postgres::PgConnectOptions>()?
                        .ssl_mode(ssl_mode);
                    Some(
                        sqlx::postgres::PgPoolOptions::new()
                            .min_connections(cfg.min_connections)
                            .max_connections(cfg.max_connections)
                            .acquire_timeout(std::time::Duration::from_secs(
                                cfg.connect_timeout_secs,
                            ))
                            .connect_with(read_options)
                            .await?,
                    )
                } else {
                    None
                };

                Ok(Self::from_postgres(write_pool, read_pool, role))
            }
        }
    }

    pub fn role(&self) -> DatabaseRole {
        self.role
    }

    /// Run the migrations belonging to this pool's role.
    ///
    /// Processing and archive migrations use disjoint version ranges and ignore
    /// each other's entries, so both sets may share one physical database.
    pub async fn run_migrations(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                tracing::info!(role = self.role.as_str(), "Running SQLite migrations");
                let mut migrator = match self.role {
                    DatabaseRole::Processing => {
                        sqlx::migrate!("./migrations_sqlx/sqlite/processing")
                    }
                    DatabaseRole::Archive => sqlx::migrate!("./migrations_sqlx/sqlite/archive"),
                };
                migrator.set_ignore_missing(true);
                migrator.run(pool).await?;
                tracing::info!(
                    role = self.role.as_str(),
                    "SQLite migrations completed successfully"
                );
                Ok(())
            }
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pools) => {
                tracing::info!(role = self.role.as_str(), "Running PostgreSQL migrations");
                let mut migrator = match self.role {
                    DatabaseRole::Processing => {
                        sqlx::migrate!("./migrations_sqlx/postgres/processing")
                    }
                    DatabaseRole::Archive => {
                        sqlx::migrate!("./migrations_sqlx/postgres/archive")
                    }
                };
                migrator.set_ignore_missing(true);
                migrator.run(&pools.write).await?;
                tracing::info!(
                    role = self.role.as_str(),
                    "PostgreSQL migrations completed successfully"
                );
                Ok(())
            }
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }

    /// Health check for database connectivity
    pub async fn health_check(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pools) => {
                sqlx::query("SELECT 1").execute(&pools.write).await?;
                if let Some(read) = &pools.read {
                    sqlx::query("SELECT 1").execute(read).await?;
                }
                Ok(())
            }
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }
}

/// Handles onto the live tables of the processing database.
#[derive(Clone)]
pub struct ProcessingStores {
    pub pending_signatures: Arc<dyn ProcessingRepo<Signature>>,
    pub validations: Arc<dyn ValidationRepo>,
    pub processed_signatures: Arc<dyn ProcessingRepo<ProcessedSignature>>,
    pub processed_validations: Arc<dyn ProcessingRepo<ProcessedValidation>>,
    pub queue_status: Arc<dyn QueueStatusRepo>,
    pub job_leases: Arc<dyn JobLeaseRepo>,
}

impl ProcessingStores {
    pub fn from_pool(pool: &DbPool) -> Self {
        let pending = RecordCategory::InvalidSignatures.processing_table();
        let validations = RecordCategory::OrphanedValidations.processing_table();
        let processed_signatures = RecordCategory::ProcessedSignatures.processing_table();
        let processed_validations = RecordCategory::ProcessedValidations.processing_table();

        match &pool.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => Self {
                pending_signatures: Arc::new(sqlite::SqliteSignatureStore::new(
                    pool.clone(),
                    pending,
                )),
                validations: Arc::new(sqlite::SqliteValidationStore::new(
                    pool.clone(),
                    validations,
                )),
                processed_signatures: Arc::new(sqlite::SqliteProcessedSignatureStore::new(
                    pool.clone(),
                    processed_signatures,
                )),
                processed_validations: Arc::new(sqlite::SqliteProcessedValidationStore::new(
                    pool.clone(),
                    processed_validations,
                )),
                queue_status: Arc::new(sqlite::SqliteQueueStatusRepo::new(pool.clone())),
                job_leases: Arc::new(sqlite::SqliteJobLeaseRepo::new(pool.clone())),
            },
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pools) => Self {
                pending_signatures: Arc::new(postgres::PostgresSignatureStore::new(
                    pools.write.clone(),
                    pools.read.clone(),
                    pending,
                )),
                validations: Arc::new(postgres::PostgresValidationStore::new(
                    pools.write.clone(),
                    pools.read.clone(),
                    validations,
                )),
                processed_signatures: Arc::new(postgres::PostgresProcessedSignatureStore::new(
                    pools.write.clone(),
                    pools.read.clone(),
                    processed_signatures,
                )),
                processed_validations: Arc::new(
                    postgres::PostgresProcessedValidationStore::new(
                        pools.write.clone(),
                        pools.read.clone(),
                        processed_validations,
                    ),
                ),
                queue_status: Arc::new(postgres::PostgresQueueStatusRepo::new(
                    pools.write.clone(),
                    pools.read.clone(),
                )),
                job_leases: Arc::new(postgres::PostgresJobLeaseRepo::new(pools.write.clone())),
            },
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }
}

/// Handles onto the append-only tables of the archive database.
#[derive(Clone)]
pub struct ArchiveStores {
    pub not_validated_signatures: Arc<dyn ArchiveRepo<Signature>>,
    pub orphaned_validations: Arc<dyn ArchiveRepo<Validation>>,
    pub processed_signatures: Arc<dyn ArchiveRepo<ProcessedSignature>>,
    pub processed_validations: Arc<dyn ArchiveRepo<ProcessedValidation>>,
}

impl ArchiveStores {
    pub fn from_pool(pool: &DbPool) -> Self {
        let not_validated = RecordCategory::InvalidSignatures.archive_table();
        let orphaned = RecordCategory::OrphanedValidations.archive_table();
        let processed_signatures = RecordCategory::ProcessedSignatures.archive_table();
        let processed_validations = RecordCategory::ProcessedValidations.archive_table();

        match &pool.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => Self {
                not_validated_signatures: Arc::new(sqlite::SqliteSignatureStore::new(
                    pool.clone(),
                    not_validated,
                )),
                orphaned_validations: Arc::new(sqlite::SqliteValidationStore::new(
                    pool.clone(),
                    orphaned,
                )),
                processed_signatures: Arc::new(sqlite::SqliteProcessedSignatureStore::new(
                    pool.clone(),
                    processed_signatures,
                )),
                processed_validations: Arc::new(sqlite::SqliteProcessedValidationStore::new(
                    pool.clone(),
                    processed_validations,
                )),
            },
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pools) => Self {
                not_validated_signatures: Arc::new(postgres::PostgresSignatureStore::new(
                    pools.write.clone(),
                    pools.read.clone(),
                    not_validated,
                )),
                orphaned_validations: Arc::new(postgres::PostgresValidationStore::new(
                    pools.write.clone(),
                    pools.read.clone(),
                    orphaned,
                )),
                processed_signatures: Arc::new(postgres::PostgresProcessedSignatureStore::new(
                    pools.write.clone(),
                    pools.read.clone(),
                    processed_signatures,
                )),
                processed_validations: Arc::new(
                    postgres::PostgresProcessedValidationStore::new(
                        pools.write.clone(),
                        pools.read.clone(),
                        processed_validations,
                    ),
                ),
            },
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }
}
