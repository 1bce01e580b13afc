use std::sync::Arc;

use uuid::Uuid;

use super::{extraction_from_products, HintAxes, SignalExtractor};
use crate::{
    db::SignalStore,
    error::AppResult,
    models::{OrderStatus, RecommendationSource, SignalExtraction},
};

/// Hints from the user's most recent purchases
#[derive(Clone)]
pub struct OrderHistoryExtractor {
    store: Arc<dyn SignalStore>,
    statuses: Vec<OrderStatus>,
    window: usize,
}

impl OrderHistoryExtractor {
    pub fn new(store: Arc<dyn SignalStore>, statuses: Vec<OrderStatus>, window: usize) -> Self {
        Self {
            store,
            statuses,
            window,
        }
    }

    /// Existence check that gates the order-history tier
    pub async fn has_qualifying_orders(&self, user_id: Uuid) -> AppResult<bool> {
        self.store.has_qualifying_orders(user_id, &self.statuses).await
    }
}

#[async_trait::async_trait]
impl SignalExtractor for OrderHistoryExtractor {
    fn source(&self) -> RecommendationSource {
        RecommendationSource::OrderHistory
    }

    async fn extract(&self, user_id: Uuid) -> AppResult<SignalExtraction> {
        let items = self
            .store
            .recent_order_items(user_id, &self.statuses, self.window)
            .await?;

        tracing::debug!(user_id = %user_id, items = items.len(), "Order items read");

        Ok(extraction_from_products(&items, HintAxes { product_type: true }))
    }
}
