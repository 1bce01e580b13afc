use std::sync::Arc;

use uuid::Uuid;

use super::{extraction_from_products, HintAxes, SignalExtractor};
use crate::{
    db::SignalStore,
    error::AppResult,
    models::{RecommendationSource, SignalExtraction},
};

/// Hints from recently wishlisted products (category and brand only)
#[derive(Clone)]
pub struct WishlistExtractor {
    store: Arc<dyn SignalStore>,
    window: usize,
}

impl WishlistExtractor {
    pub fn new(store: Arc<dyn SignalStore>, window: usize) -> Self {
        Self { store, window }
    }
}

#[async_trait::async_trait]
impl SignalExtractor for WishlistExtractor {
    fn source(&self) -> RecommendationSource {
        RecommendationSource::Wishlist
    }

    async fn extract(&self, user_id: Uuid) -> AppResult<SignalExtraction> {
        let items = self.store.recent_wishlist_items(user_id, self.window).await?;

        tracing::debug!(user_id = %user_id, items = items.len(), "Wishlist items read");

        Ok(extraction_from_products(&items, HintAxes { product_type: false }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MockSignalStore;
    use crate::models::SignalProduct;

    #[tokio::test]
    async fn test_wishlist_hints_skip_product_type() {
        let category = Uuid::new_v4();
        let brand = Uuid::new_v4();
        let wished = Uuid::new_v4();

        let mut store = MockSignalStore::new();
        store
            .expect_recent_wishlist_items()
            .withf(|_, limit| *limit == 10)
            .returning(move |_, _| {
                Ok(vec![SignalProduct {
                    product_id: wished,
                    category_id: category,
                    sub_category_id: None,
                    product_type_id: Some(Uuid::new_v4()),
                    brand_id: Some(brand),
                }])
            });

        let extractor = WishlistExtractor::new(Arc::new(store), 10);
        let extraction = extractor.extract(Uuid::new_v4()).await.unwrap();

        assert_eq!(extraction.hints.category_ids, vec![category]);
        assert_eq!(extraction.hints.brand_ids, vec![brand]);
        assert!(extraction.hints.product_type_ids.is_empty());
        assert_eq!(extraction.implicated, vec![wished]);
    }

    #[tokio::test]
    async fn test_empty_wishlist() {
        let mut store = MockSignalStore::new();
        store
            .expect_recent_wishlist_items()
            .returning(|_, _| Ok(vec![]));

        let extractor = WishlistExtractor::new(Arc::new(store), 10);
        let extraction = extractor.extract(Uuid::new_v4()).await.unwrap();

        assert!(!extraction.sufficient_evidence);
        assert!(extraction.hints.is_empty());
    }
}
