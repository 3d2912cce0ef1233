//! SQLite ledger backend.

use super::{Ledger, VersionFilter};
use crate::error::{LedgerError, LedgerResult};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use vault_types::{
    ChangeType, ContentHash, EncryptionMetadata, ResourceId, StorageKey, VersionMetadata,
    VersionNumber, VersionRecord,
};

/// SQLite-based version ledger.
///
/// Uses WAL mode for concurrent reads/writes.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Open a ledger at a database path.
    ///
    /// Creates the database file if it doesn't exist.
    pub async fn new(path: &Path) -> LedgerResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        let ledger = Self { pool };
        ledger.run_migrations().await?;
        tracing::debug!(path = %path.display(), "opened sqlite ledger");
        Ok(ledger)
    }

    /// Create an in-memory ledger (for testing).
    pub async fn in_memory() -> LedgerResult<Self> {
        let options = SqliteConnectOptions::from_str(":memory:")?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let ledger = Self { pool };
        ledger.run_migrations().await?;
        Ok(ledger)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> LedgerResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS version_counters (
                resource_id TEXT PRIMARY KEY,
                last_version INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS versions (
                resource_id TEXT NOT NULL,
                version INTEGER NOT NULL,
                storage_key TEXT NOT NULL UNIQUE,
                file_hash TEXT NOT NULL,
                encryption TEXT NOT NULL,
                change_type TEXT NOT NULL,
                last_modified INTEGER NOT NULL,
                size INTEGER NOT NULL,
                mime_type TEXT NOT NULL,
                modified_by TEXT,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (resource_id, version)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_versions_resource ON versions(resource_id, version DESC)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| LedgerError::Migration(e.to_string()))?;
        }

        Ok(())
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn next_version(&self, resource_id: &ResourceId) -> LedgerResult<VersionNumber> {
        let version: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO version_counters (resource_id, last_version)
            VALUES (?1, 1)
            ON CONFLICT(resource_id) DO UPDATE SET last_version = last_version + 1
            RETURNING last_version
            "#,
        )
        .bind(resource_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(VersionNumber::new(version as u64))
    }

    async fn insert(&self, record: VersionRecord) -> LedgerResult<VersionRecord> {
        let encryption = serde_json::to_string(&record.encryption)?;

        let result = sqlx::query(
            r#"
            INSERT INTO versions (
                resource_id, version, storage_key, file_hash, encryption, change_type,
                last_modified, size, mime_type, modified_by, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(record.resource_id.as_str())
        .bind(record.version.value() as i64)
        .bind(record.storage_key.as_str())
        .bind(record.file_hash.to_hex())
        .bind(encryption)
        .bind(record.change_type.as_str())
        .bind(record.metadata.last_modified)
        .bind(record.metadata.size as i64)
        .bind(&record.metadata.mime_type)
        .bind(record.metadata.modified_by.as_deref())
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(record),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(LedgerError::Duplicate {
                    resource_id: record.resource_id.to_string(),
                    version: record.version.value(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_resource(&self, resource_id: &ResourceId) -> LedgerResult<Vec<VersionRecord>> {
        let rows = sqlx::query_as::<_, VersionRow>(
            r#"
            SELECT resource_id, version, storage_key, file_hash, encryption, change_type,
                   last_modified, size, mime_type, modified_by, created_at
            FROM versions
            WHERE resource_id = ?1
            ORDER BY version DESC
            "#,
        )
        .bind(resource_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }

    async fn find_version(
        &self,
        resource_id: &ResourceId,
        version: VersionNumber,
    ) -> LedgerResult<Option<VersionRecord>> {
        let row = sqlx::query_as::<_, VersionRow>(
            r#"
            SELECT resource_id, version, storage_key, file_hash, encryption, change_type,
                   last_modified, size, mime_type, modified_by, created_at
            FROM versions
            WHERE resource_id = ?1 AND version = ?2
            "#,
        )
        .bind(resource_id.as_str())
        .bind(version.value() as i64)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(r.try_into()?)),
            None => Ok(None),
        }
    }

    async fn delete_many(&self, filter: &VersionFilter) -> LedgerResult<u64> {
        match filter {
            VersionFilter::Resource(resource_id) => {
                let result = sqlx::query("DELETE FROM versions WHERE resource_id = ?1")
                    .bind(resource_id.as_str())
                    .execute(&self.pool)
                    .await?;
                Ok(result.rows_affected())
            }
            VersionFilter::Versions {
                resource_id,
                versions,
            } => {
                if versions.is_empty() {
                    return Ok(0);
                }

                // One transaction so a batch is removed all-or-nothing
                let mut tx = self.pool.begin().await?;
                let mut deleted = 0;
                for version in versions {
                    let result =
                        sqlx::query("DELETE FROM versions WHERE resource_id = ?1 AND version = ?2")
                            .bind(resource_id.as_str())
                            .bind(version.value() as i64)
                            .execute(&mut *tx)
                            .await?;
                    deleted += result.rows_affected();
                }
                tx.commit().await?;
                Ok(deleted)
            }
        }
    }

    async fn storage_keys(&self) -> LedgerResult<HashSet<StorageKey>> {
        let keys: Vec<String> = sqlx::query_scalar("SELECT storage_key FROM versions")
            .fetch_all(&self.pool)
            .await?;

        Ok(keys.into_iter().map(StorageKey::from_raw).collect())
    }
}

/// Internal row type for SQLite queries.
#[derive(sqlx::FromRow)]
struct VersionRow {
    resource_id: String,
    version: i64,
    storage_key: String,
    file_hash: String,
    encryption: String,
    change_type: String,
    last_modified: i64,
    size: i64,
    mime_type: String,
    modified_by: Option<String>,
    created_at: i64,
}

impl TryFrom<VersionRow> for VersionRecord {
    type Error = LedgerError;

    fn try_from(row: VersionRow) -> Result<Self, Self::Error> {
        let corrupt = |e: vault_types::TypesError| LedgerError::Corrupt(e.to_string());
        let encryption: EncryptionMetadata = serde_json::from_str(&row.encryption)?;

        Ok(VersionRecord {
            resource_id: ResourceId::new(row.resource_id).map_err(corrupt)?,
            version: VersionNumber::new(row.version as u64),
            storage_key: StorageKey::from_raw(row.storage_key),
            file_hash: ContentHash::from_hex(&row.file_hash).map_err(corrupt)?,
            encryption,
            change_type: row.change_type.parse::<ChangeType>().map_err(corrupt)?,
            metadata: VersionMetadata {
                last_modified: row.last_modified,
                size: row.size as u64,
                mime_type: row.mime_type,
                modified_by: row.modified_by,
            },
            created_at: row.created_at,
        })
    }
}
