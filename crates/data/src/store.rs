//! PostgreSQL snapshot store.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::models::{EventRecord, SnapshotRecord};

/// Typed access to the snapshot and event tables.
///
/// Holds a connection pool; clones share the pool, so each consumer can
/// own its handle without sharing a mutable connection.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    pool: PgPool,
}

impl SnapshotStore {
    /// Connects to the database.
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to the snapshot database")?;
        info!(max_connections, "connected to snapshot store");
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists all event ids with at least one snapshot, sorted.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_event_ids(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT event_id
            FROM snapshots
            ORDER BY event_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list event ids")?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Fetches one event's metadata, if stored.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn fetch_event(&self, event_id: &str) -> Result<Option<EventRecord>> {
        sqlx::query_as::<_, EventRecord>(
            r#"
            SELECT event_id, start_time, duration_seconds, winner
            FROM events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to fetch event {event_id}"))
    }

    /// Fetches one event's snapshot rows in time order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn fetch_snapshots(&self, event_id: &str) -> Result<Vec<SnapshotRecord>> {
        sqlx::query_as::<_, SnapshotRecord>(
            r#"
            SELECT event_id, snapshot_time, forecast_prob, model_prob,
                   home_mid, home_bid, home_ask,
                   away_mid, away_bid, away_ask
            FROM snapshots
            WHERE event_id = $1
            ORDER BY snapshot_time ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to fetch snapshots for event {event_id}"))
    }
}
