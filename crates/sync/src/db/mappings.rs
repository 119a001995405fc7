//! Product mapping persistence (`sync.product_mappings`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use printbridge_core::{ProductId, SupplierProductId, SyncStatus};
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;
use crate::mapping::{MappingRecord, MappingRepository, StatusCounts};

/// Database row for `sync.product_mappings`.
#[derive(Debug, Clone, sqlx::FromRow)]
struct MappingRow {
    supplier_product_id: String,
    local_product_id: ProductId,
    sync_status: String,
    last_synced: DateTime<Utc>,
}

impl TryFrom<MappingRow> for MappingRecord {
    type Error = RepositoryError;

    fn try_from(row: MappingRow) -> Result<Self, Self::Error> {
        let sync_status = row
            .sync_status
            .parse::<SyncStatus>()
            .map_err(RepositoryError::DataCorruption)?;
        Ok(Self {
            supplier_product_id: SupplierProductId::new(row.supplier_product_id),
            local_product_id: row.local_product_id,
            sync_status,
            last_synced: row.last_synced,
        })
    }
}

/// `PostgreSQL` implementation of [`MappingRepository`].
#[derive(Clone)]
pub struct PgMappingRepository {
    pool: PgPool,
}

impl PgMappingRepository {
    /// Create a new mapping repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MappingRepository for PgMappingRepository {
    #[instrument(skip(self), fields(supplier_id = %supplier_id, local_id = %local_id))]
    async fn upsert(
        &self,
        supplier_id: &SupplierProductId,
        local_id: ProductId,
        status: SyncStatus,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO sync.product_mappings (supplier_product_id, local_product_id, sync_status, last_synced)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (supplier_product_id) DO UPDATE
            SET local_product_id = EXCLUDED.local_product_id,
                sync_status = EXCLUDED.sync_status,
                last_synced = NOW()
            ",
        )
        .bind(supplier_id.as_str())
        .bind(local_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_supplier(
        &self,
        supplier_id: &SupplierProductId,
    ) -> Result<Option<MappingRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, MappingRow>(
            r"
            SELECT supplier_product_id, local_product_id, sync_status, last_synced
            FROM sync.product_mappings
            WHERE supplier_product_id = $1
            ",
        )
        .bind(supplier_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(MappingRecord::try_from).transpose()
    }

    async fn find_by_local(
        &self,
        local_id: ProductId,
    ) -> Result<Option<MappingRecord>, RepositoryError> {
        // Most recently synced wins if application logic ever let two rows share a local ID
        let row = sqlx::query_as::<_, MappingRow>(
            r"
            SELECT supplier_product_id, local_product_id, sync_status, last_synced
            FROM sync.product_mappings
            WHERE local_product_id = $1
            ORDER BY last_synced DESC
            LIMIT 1
            ",
        )
        .bind(local_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MappingRecord::try_from).transpose()
    }

    #[instrument(skip(self), fields(supplier_id = %supplier_id))]
    async fn update_status(
        &self,
        supplier_id: &SupplierProductId,
        status: SyncStatus,
    ) -> Result<Option<MappingRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, MappingRow>(
            r"
            UPDATE sync.product_mappings
            SET sync_status = $2, last_synced = NOW()
            WHERE supplier_product_id = $1
            RETURNING supplier_product_id, local_product_id, sync_status, last_synced
            ",
        )
        .bind(supplier_id.as_str())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(MappingRecord::try_from).transpose()
    }

    async fn list(
        &self,
        status: Option<SyncStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MappingRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, MappingRow>(
            r"
            SELECT supplier_product_id, local_product_id, sync_status, last_synced
            FROM sync.product_mappings
            WHERE ($1::TEXT IS NULL OR sync_status = $1)
            ORDER BY last_synced DESC, supplier_product_id
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MappingRecord::try_from).collect()
    }

    #[instrument(skip(self), fields(supplier_id = %supplier_id))]
    async fn delete(&self, supplier_id: &SupplierProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sync.product_mappings WHERE supplier_product_id = $1")
            .bind(supplier_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_by_status(&self) -> Result<StatusCounts, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r"
            SELECT sync_status, COUNT(*)
            FROM sync.product_mappings
            GROUP BY sync_status
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            let status = status
                .parse::<SyncStatus>()
                .map_err(RepositoryError::DataCorruption)?;
            counts.add(status, u64::try_from(count).unwrap_or_default());
        }
        Ok(counts)
    }
}
