use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, EventEnvelope, EventId, Result, StoreError, Version,
    store::{Commit, EntityStore, StreamAppend, validate_commit},
};

/// PostgreSQL-backed entity store.
///
/// `entity_streams` holds one head row per record with its current version;
/// `entity_events` holds the changes. A commit claims every head it touches
/// with a compare-and-set inside one database transaction, so a stale head
/// aborts the whole commit.
#[derive(Clone)]
pub struct PostgresEntityStore {
    pool: PgPool,
}

impl PostgresEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the bundled schema migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;

        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            version: Version::new(row.try_get("version")?),
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
            metadata,
        })
    }

    async fn head_version(
        tx: &mut Transaction<'_, Postgres>,
        aggregate_id: AggregateId,
    ) -> Result<Version> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM entity_streams WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_optional(&mut **tx)
                .await?;
        Ok(Version::new(version.unwrap_or(0)))
    }

    /// Moves a record's head from its expected version to the new one.
    async fn claim_head(
        tx: &mut Transaction<'_, Postgres>,
        stream: &StreamAppend,
    ) -> Result<()> {
        let aggregate_type = &stream.events[0].aggregate_type;
        let new_version = stream.resulting_version();

        let claimed = if stream.expected_version == Version::initial() {
            sqlx::query(
                r#"
                INSERT INTO entity_streams (aggregate_id, aggregate_type, version)
                VALUES ($1, $2, $3)
                ON CONFLICT (aggregate_id) DO NOTHING
                "#,
            )
            .bind(stream.aggregate_id.as_uuid())
            .bind(aggregate_type)
            .bind(new_version.as_i64())
            .execute(&mut **tx)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE entity_streams
                SET version = $3, updated_at = now()
                WHERE aggregate_id = $1 AND version = $2
                "#,
            )
            .bind(stream.aggregate_id.as_uuid())
            .bind(stream.expected_version.as_i64())
            .bind(new_version.as_i64())
            .execute(&mut **tx)
            .await?
        };

        if claimed.rows_affected() == 0 {
            let actual = Self::head_version(tx, stream.aggregate_id).await?;
            metrics::counter!("entity_store_conflicts_total").increment(1);
            return Err(StoreError::ConcurrencyConflict {
                aggregate_id: stream.aggregate_id,
                expected: stream.expected_version,
                actual,
            });
        }

        Ok(())
    }

    async fn insert_event(
        tx: &mut Transaction<'_, Postgres>,
        event: &EventEnvelope,
        expected: Version,
    ) -> Result<()> {
        let metadata_json = serde_json::to_value(&event.metadata)?;

        sqlx::query(
            r#"
            INSERT INTO entity_events (id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.event_id.as_uuid())
        .bind(&event.event_type)
        .bind(event.aggregate_id.as_uuid())
        .bind(&event.aggregate_type)
        .bind(event.version.as_i64())
        .bind(event.timestamp)
        .bind(&event.payload)
        .bind(metadata_json)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_aggregate_version")
            {
                return StoreError::ConcurrencyConflict {
                    aggregate_id: event.aggregate_id,
                    expected,
                    actual: event.version,
                };
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }
}

#[async_trait]
impl EntityStore for PostgresEntityStore {
    async fn commit(&self, commit: Commit) -> Result<Vec<Version>> {
        validate_commit(&commit)?;

        // Claim heads in a fixed order so two commits over the same records
        // cannot deadlock each other.
        let mut order: Vec<usize> = (0..commit.streams.len()).collect();
        order.sort_by_key(|&i| commit.streams[i].aggregate_id);

        // Dropping `tx` without commit rolls everything back.
        let mut tx = self.pool.begin().await?;

        for &i in &order {
            Self::claim_head(&mut tx, &commit.streams[i]).await?;
        }

        for &i in &order {
            let stream = &commit.streams[i];
            for event in &stream.events {
                Self::insert_event(&mut tx, event, stream.expected_version).await?;
            }
        }

        tx.commit().await?;

        metrics::counter!("entity_store_commits_total", "backend" => "postgres").increment(1);
        tracing::trace!(transaction_id = %commit.transaction_id, "commit applied");

        Ok(commit
            .streams
            .iter()
            .map(StreamAppend::resulting_version)
            .collect())
    }

    async fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata
            FROM entity_events
            WHERE aggregate_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(aggregate_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn stream_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM entity_streams WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }

    async fn list_records(&self, aggregate_type: &str) -> Result<Vec<AggregateId>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT aggregate_id FROM entity_streams WHERE aggregate_type = $1 ORDER BY aggregate_id",
        )
        .bind(aggregate_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(AggregateId::from_uuid).collect())
    }
}
