use std::sync::Arc;

use uuid::Uuid;

use super::SignalExtractor;
use crate::{
    db::SignalStore,
    error::AppResult,
    models::{RecommendationSource, SearchMatch, SignalExtraction},
};

/// Hints from the taxonomy matches of recent searches.
///
/// Searches reference no concrete product, so nothing is implicated.
#[derive(Clone)]
pub struct SearchHistoryExtractor {
    store: Arc<dyn SignalStore>,
    window: usize,
}

impl SearchHistoryExtractor {
    pub fn new(store: Arc<dyn SignalStore>, window: usize) -> Self {
        Self { store, window }
    }
}

fn extraction_from_matches(matches: &[SearchMatch]) -> SignalExtraction {
    let mut extraction = SignalExtraction::empty();

    for matched in matches.iter().filter(|m| !m.is_empty()) {
        if let Some(id) = matched.category_id {
            extraction.hints.add_category(id);
        }
        if let Some(id) = matched.sub_category_id {
            extraction.hints.add_sub_category(id);
        }
        if let Some(id) = matched.product_type_id {
            extraction.hints.add_product_type(id);
        }
        if let Some(id) = matched.brand_id {
            extraction.hints.add_brand(id);
        }
    }

    extraction.sufficient_evidence = !extraction.hints.is_empty();
    extraction
}

#[async_trait::async_trait]
impl SignalExtractor for SearchHistoryExtractor {
    fn source(&self) -> RecommendationSource {
        RecommendationSource::SearchHistory
    }

    async fn extract(&self, user_id: Uuid) -> AppResult<SignalExtraction> {
        let matches = self.store.recent_search_matches(user_id, self.window).await?;

        tracing::debug!(user_id = %user_id, searches = matches.len(), "Search logs read");

        Ok(extraction_from_matches(&matches))
    }
}
