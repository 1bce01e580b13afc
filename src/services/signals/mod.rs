//! Signal extractors
//!
//! Each extractor reads one behavioural source for a user and turns it into
//! affinity hints plus the products already implicated by that signal.

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{RecommendationSource, SignalExtraction, SignalProduct},
};

pub mod browsing;
pub mod order_history;
pub mod search;
pub mod wishlist;

pub use browsing::BrowsingHistoryExtractor;
pub use order_history::OrderHistoryExtractor;
pub use search::SearchHistoryExtractor;
pub use wishlist::WishlistExtractor;

/// A strategy that derives hints from one signal source
#[async_trait::async_trait]
pub trait SignalExtractor: Send + Sync {
    /// Tier this extractor feeds
    fn source(&self) -> RecommendationSource;

    async fn extract(&self, user_id: Uuid) -> AppResult<SignalExtraction>;
}

/// Which catalog axes of a signal product become hints
#[derive(Debug, Clone, Copy)]
pub(crate) struct HintAxes {
    pub product_type: bool,
}

/// Builds an extraction from signal products, most recent first
pub(crate) fn extraction_from_products(items: &[SignalProduct], axes: HintAxes) -> SignalExtraction {
    if items.is_empty() {
        return SignalExtraction::empty();
    }

    let mut extraction = SignalExtraction {
        sufficient_evidence: true,
        ..Default::default()
    };

    for item in items {
        extraction.hints.add_category(item.category_id);
        if let Some(brand_id) = item.brand_id {
            extraction.hints.add_brand(brand_id);
        }
        if axes.product_type {
            if let Some(product_type_id) = item.product_type_id {
                extraction.hints.add_product_type(product_type_id);
            }
        }
        if !extraction.implicated.contains(&item.product_id) {
            extraction.implicated.push(item.product_id);
        }
    }

    extraction
}
