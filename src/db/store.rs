use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        AffinityHints, BrowsingEventKind, OrderStatus, ProductCandidate, ProductDisplay,
        SearchMatch, SignalProduct,
    },
    services::ranker::TieBreakPredicate,
};

/// Restriction a tier places on which catalog rows may be selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateFilter {
    Unrestricted,
    Categories(Vec<Uuid>),
    SubCategories(Vec<Uuid>),
    ProductTypes(Vec<Uuid>),
    Brands(Vec<Uuid>),
}

impl CandidateFilter {
    pub fn matches(&self, candidate: &ProductCandidate) -> bool {
        match self {
            CandidateFilter::Unrestricted => true,
            CandidateFilter::Categories(ids) => ids.contains(&candidate.category_id),
            CandidateFilter::SubCategories(ids) => candidate
                .sub_category_id
                .is_some_and(|id| ids.contains(&id)),
            CandidateFilter::ProductTypes(ids) => candidate
                .product_type_id
                .is_some_and(|id| ids.contains(&id)),
            CandidateFilter::Brands(ids) => {
                candidate.brand_id.is_some_and(|id| ids.contains(&id))
            }
        }
    }
}

/// Eligible-products query issued by the candidate selector.
///
/// Stores must apply `order` before `limit` so truncation keeps the
/// best-ranked rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub filter: CandidateFilter,
    pub hints: AffinityHints,
    pub order: Vec<TieBreakPredicate>,
    pub exclude: Vec<Uuid>,
    pub limit: usize,
}

/// Read-only access to the product catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Published, active, available, non-deleted, approved products with media
    async fn eligible_products(&self, query: &CatalogQuery) -> AppResult<Vec<ProductCandidate>>;

    /// Display payloads keyed by product id; unknown ids are absent
    async fn product_displays(
        &self,
        product_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, ProductDisplay>>;
}

/// Read-only access to behavioural signal sources
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SignalStore: Send + Sync {
    async fn has_qualifying_orders(
        &self,
        user_id: Uuid,
        statuses: &[OrderStatus],
    ) -> AppResult<bool>;

    /// Most recent order line items first
    async fn recent_order_items(
        &self,
        user_id: Uuid,
        statuses: &[OrderStatus],
        limit: usize,
    ) -> AppResult<Vec<SignalProduct>>;

    async fn recent_wishlist_items(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<SignalProduct>>;

    async fn recent_browsing_events(
        &self,
        user_id: Uuid,
        kinds: &[BrowsingEventKind],
        limit: usize,
    ) -> AppResult<Vec<SignalProduct>>;

    /// Only entries that matched at least one taxonomy axis
    async fn recent_search_matches(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<SearchMatch>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candidate() -> ProductCandidate {
        ProductCandidate {
            id: Uuid::new_v4(),
            name: "Lamp".to_string(),
            slug: "lamp".to_string(),
            category_id: Uuid::new_v4(),
            sub_category_id: Some(Uuid::new_v4()),
            product_type_id: None,
            brand_id: Some(Uuid::new_v4()),
            is_best_seller: false,
            created_at: Utc::now(),
            display: None,
        }
    }

    #[test]
    fn test_unrestricted_matches_everything() {
        assert!(CandidateFilter::Unrestricted.matches(&candidate()));
    }

    #[test]
    fn test_category_filter() {
        let c = candidate();
        assert!(CandidateFilter::Categories(vec![c.category_id]).matches(&c));
        assert!(!CandidateFilter::Categories(vec![Uuid::new_v4()]).matches(&c));
        assert!(!CandidateFilter::Categories(vec![]).matches(&c));
    }

    #[test]
    fn test_optional_axes_never_match_missing_values() {
        let c = candidate();
        assert!(!CandidateFilter::ProductTypes(vec![Uuid::new_v4()]).matches(&c));
        assert!(CandidateFilter::SubCategories(vec![c.sub_category_id.unwrap()]).matches(&c));
        assert!(CandidateFilter::Brands(vec![c.brand_id.unwrap()]).matches(&c));
    }
}
