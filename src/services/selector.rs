use std::sync::Arc;

use crate::{
    db::{CandidateFilter, CatalogQuery, CatalogStore},
    error::AppResult,
    models::{AffinityHints, ProductCandidate, RecommendationSource},
    services::{exclusion::ExclusionSet, ranker, ranker::TieBreakPredicate},
};

/// Picks eligible catalog products for one tier
#[derive(Clone)]
pub struct CandidateSelector {
    catalog: Arc<dyn CatalogStore>,
}

impl CandidateSelector {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    /// Catalog restriction a tier applies to its hints
    pub fn filter_for_tier(source: RecommendationSource, hints: &AffinityHints) -> CandidateFilter {
        match source {
            RecommendationSource::OrderHistory | RecommendationSource::PlatformDefaults => {
                CandidateFilter::Unrestricted
            }
            RecommendationSource::Wishlist | RecommendationSource::BrowsingHistory => {
                CandidateFilter::Categories(hints.category_ids.clone())
            }
            RecommendationSource::SearchHistory => {
                if !hints.product_type_ids.is_empty() {
                    CandidateFilter::ProductTypes(hints.product_type_ids.clone())
                } else if !hints.sub_category_ids.is_empty() {
                    CandidateFilter::SubCategories(hints.sub_category_ids.clone())
                } else if !hints.category_ids.is_empty() {
                    CandidateFilter::Categories(hints.category_ids.clone())
                } else {
                    CandidateFilter::Brands(hints.brand_ids.clone())
                }
            }
        }
    }

    /// Ranked candidates for a tier, never containing an excluded id and at
    /// most `limit` long
    pub async fn select(
        &self,
        source: RecommendationSource,
        hints: &AffinityHints,
        exclusions: &ExclusionSet,
        limit: usize,
    ) -> AppResult<Vec<ProductCandidate>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let predicates = TieBreakPredicate::for_tier(source);
        let query = CatalogQuery {
            filter: Self::filter_for_tier(source, hints),
            hints: hints.clone(),
            order: predicates.to_vec(),
            exclude: exclusions.to_sorted_vec(),
            limit,
        };

        let rows = self.catalog.eligible_products(&query).await?;
        let returned = rows.len();

        let candidates: Vec<ProductCandidate> = rows
            .into_iter()
            .filter(|candidate| !exclusions.contains(&candidate.id))
            .filter(|candidate| query.filter.matches(candidate))
            .collect();

        if candidates.len() != returned {
            tracing::warn!(
                tier = %source,
                returned,
                kept = candidates.len(),
                "Catalog returned rows outside the tier restriction"
            );
        }

        let mut ranked = ranker::rank(candidates, hints, predicates);
        ranked.truncate(limit);

        tracing::debug!(tier = %source, selected = ranked.len(), "Candidates selected");

        Ok(ranked)
    }
}
