use std::sync::Arc;

use uuid::Uuid;

use super::{extraction_from_products, HintAxes, SignalExtractor};
use crate::{
    db::SignalStore,
    error::AppResult,
    models::{BrowsingEventKind, RecommendationSource, SignalExtraction},
};

/// Event kinds that count as browsing interest
const BROWSING_KINDS: &[BrowsingEventKind] = &[BrowsingEventKind::View, BrowsingEventKind::Click];

#[derive(Clone)]
pub struct BrowsingHistoryExtractor {
    store: Arc<dyn SignalStore>,
    window: usize,
}

impl BrowsingHistoryExtractor {
    pub fn new(store: Arc<dyn SignalStore>, window: usize) -> Self {
        Self { store, window }
    }
}

#[async_trait::async_trait]
impl SignalExtractor for BrowsingHistoryExtractor {
    fn source(&self) -> RecommendationSource {
        RecommendationSource::BrowsingHistory
    }

    async fn extract(&self, user_id: Uuid) -> AppResult<SignalExtraction> {
        let items = self
            .store
            .recent_browsing_events(user_id, BROWSING_KINDS, self.window)
            .await?;

        tracing::debug!(user_id = %user_id, events = items.len(), "Browsing events read");

        Ok(extraction_from_products(&items, HintAxes { product_type: true }))
    }
}
