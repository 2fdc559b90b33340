//! The async boundary between the grid search and its data source.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use oddsgap_align::EventTimeline;
use thiserror::Error;

/// Why a timeline could not be supplied.
///
/// The orchestrator recovers from [`ProviderError::MissingEvent`] by
/// skipping the event; [`ProviderError::Unavailable`] is fatal and aborts
/// the run immediately.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("event {0} has no stored timeline")]
    MissingEvent(String),

    #[error("data source unavailable")]
    Unavailable(#[source] anyhow::Error),
}

/// Supplies aligned timelines by event id.
///
/// Implementations own their data-source handles; the orchestrator clones
/// the provider `Arc` per worker and never shares a mutable connection.
#[async_trait]
pub trait TimelineProvider: Send + Sync {
    async fn timeline(&self, event_id: &str) -> Result<EventTimeline, ProviderError>;
}

/// Provider over pre-built timelines, for tests and file-backed runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    timelines: HashMap<String, Arc<EventTimeline>>,
}

impl InMemoryProvider {
    #[must_use]
    pub fn new(timelines: impl IntoIterator<Item = EventTimeline>) -> Self {
        Self {
            timelines: timelines
                .into_iter()
                .map(|t| (t.event_id.clone(), Arc::new(t)))
                .collect(),
        }
    }

    /// Event ids available in this provider, sorted.
    #[must_use]
    pub fn event_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.timelines.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl TimelineProvider for InMemoryProvider {
    async fn timeline(&self, event_id: &str) -> Result<EventTimeline, ProviderError> {
        self.timelines
            .get(event_id)
            .map(|t| EventTimeline::clone(t))
            .ok_or_else(|| ProviderError::MissingEvent(event_id.to_string()))
    }
}
