use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ActorKey, EventId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::state::{StateEnvelope, Version};
use crate::store::EntityStore;
use crate::{EntityStoreError, Result};

/// PostgreSQL-backed entity store implementation.
///
/// One row per actor key; writes run in a transaction that locks the row
/// and compares the stored version before updating.
#[derive(Clone)]
pub struct PostgresEntityStore {
    pool: PgPool,
}

impl PostgresEntityStore {
    /// Creates a new PostgreSQL entity store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the backing table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entity_state (
                tenant_id UUID NOT NULL,
                actor_type TEXT NOT NULL,
                entity_id UUID NOT NULL,
                version BIGINT NOT NULL,
                payload JSONB NOT NULL,
                last_applied_event_id UUID,
                updated_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (tenant_id, actor_type, entity_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_envelope(row: PgRow) -> Result<StateEnvelope> {
        let last_applied: Option<Uuid> = row.try_get("last_applied_event_id")?;
        Ok(StateEnvelope {
            version: Version::new(row.try_get("version")?),
            payload: row.try_get("payload")?,
            last_applied_event_id: last_applied.map(EventId::from_uuid),
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }
}

#[async_trait]
impl EntityStore for PostgresEntityStore {
    async fn load(&self, key: &ActorKey) -> Result<Option<StateEnvelope>> {
        let row = sqlx::query(
            r#"
            SELECT version, payload, last_applied_event_id, updated_at
            FROM entity_state
            WHERE tenant_id = $1 AND actor_type = $2 AND entity_id = $3
            "#,
        )
        .bind(key.tenant.as_uuid())
        .bind(key.actor_type)
        .bind(key.entity.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_envelope).transpose()
    }

    async fn save(
        &self,
        key: &ActorKey,
        envelope: StateEnvelope,
        expected: Version,
    ) -> Result<Version> {
        let mut tx = self.pool.begin().await?;

        let current: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT version FROM entity_state
            WHERE tenant_id = $1 AND actor_type = $2 AND entity_id = $3
            FOR UPDATE
            "#,
        )
        .bind(key.tenant.as_uuid())
        .bind(key.actor_type)
        .bind(key.entity.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let actual = current.map(Version::new).unwrap_or(Version::initial());
        if actual != expected {
            metrics::counter!("entity_store_conflicts_total").increment(1);
            return Err(EntityStoreError::VersionConflict {
                key: key.to_string(),
                expected,
                actual,
            });
        }

        let written = envelope.version;
        if current.is_some() {
            sqlx::query(
                r#"
                UPDATE entity_state
                SET version = $4, payload = $5, last_applied_event_id = $6, updated_at = $7
                WHERE tenant_id = $1 AND actor_type = $2 AND entity_id = $3
                "#,
            )
            .bind(key.tenant.as_uuid())
            .bind(key.actor_type)
            .bind(key.entity.as_uuid())
            .bind(written.as_i64())
            .bind(&envelope.payload)
            .bind(envelope.last_applied_event_id.map(|id| id.as_uuid()))
            .bind(envelope.updated_at)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO entity_state
                    (tenant_id, actor_type, entity_id, version, payload, last_applied_event_id, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(key.tenant.as_uuid())
            .bind(key.actor_type)
            .bind(key.entity.as_uuid())
            .bind(written.as_i64())
            .bind(&envelope.payload)
            .bind(envelope.last_applied_event_id.map(|id| id.as_uuid()))
            .bind(envelope.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(%key, version = %written, "entity state saved");
        Ok(written)
    }

    async fn current_version(&self, key: &ActorKey) -> Result<Option<Version>> {
        let version: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT version FROM entity_state
            WHERE tenant_id = $1 AND actor_type = $2 AND entity_id = $3
            "#,
        )
        .bind(key.tenant.as_uuid())
        .bind(key.actor_type)
        .bind(key.entity.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(version.map(Version::new))
    }
}
