//! Timeline provider backed by the snapshot store.

use async_trait::async_trait;
use oddsgap_align::{EventTimeline, SnapshotAligner, SnapshotRow};
use oddsgap_backtest::{ProviderError, TimelineProvider};
use tracing::debug;

use crate::store::SnapshotStore;

/// Fetches raw rows from the store and aligns them on the fly.
///
/// Cloning shares the underlying pool, so the orchestrator can hand each
/// worker its own provider handle.
#[derive(Debug, Clone)]
pub struct StoreTimelineProvider {
    store: SnapshotStore,
    aligner: SnapshotAligner,
}

impl StoreTimelineProvider {
    #[must_use]
    pub fn new(store: SnapshotStore, aligner: SnapshotAligner) -> Self {
        Self { store, aligner }
    }
}

#[async_trait]
impl TimelineProvider for StoreTimelineProvider {
    async fn timeline(&self, event_id: &str) -> Result<EventTimeline, ProviderError> {
        let meta = self
            .store
            .fetch_event(event_id)
            .await
            .map_err(ProviderError::Unavailable)?
            .ok_or_else(|| ProviderError::MissingEvent(event_id.to_string()))?
            .into_meta();

        let rows: Vec<SnapshotRow> = self
            .store
            .fetch_snapshots(event_id)
            .await
            .map_err(ProviderError::Unavailable)?
            .into_iter()
            .map(|record| record.into_row())
            .collect();

        // An event with zero usable rows aligns to an empty timeline and
        // simulates to zero trades; that is not an error here.
        let (timeline, stats) = self.aligner.align(&meta, &rows);
        debug!(
            event_id,
            kept = stats.kept,
            dropped = stats.dropped(),
            warnings = stats.complement_warnings,
            "built timeline from store"
        );
        Ok(timeline)
    }
}
