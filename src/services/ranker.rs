use std::cmp::Ordering;

use uuid::Uuid;

use crate::models::{AffinityHints, ProductCandidate, RecommendationSource};

/// One tie-break key of a tier's ordering.
///
/// Predicates are applied in sequence; each only orders the ties left by
/// the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreakPredicate {
    /// Candidates in a hinted category first
    SameCategory,
    /// Candidates of a hinted brand first
    SameBrand,
    /// Candidates of a hinted product type first
    SameProductType,
    /// Best-sellers first
    BestSeller,
    /// Most recently created first
    Newest,
}

const ORDER_HISTORY: &[TieBreakPredicate] = &[
    TieBreakPredicate::SameCategory,
    TieBreakPredicate::SameBrand,
    TieBreakPredicate::SameProductType,
    TieBreakPredicate::BestSeller,
    TieBreakPredicate::Newest,
];

const WISHLIST: &[TieBreakPredicate] = &[
    TieBreakPredicate::SameCategory,
    TieBreakPredicate::SameBrand,
    TieBreakPredicate::BestSeller,
    TieBreakPredicate::Newest,
];

const BROWSING_HISTORY: &[TieBreakPredicate] = ORDER_HISTORY;

const SEARCH_HISTORY: &[TieBreakPredicate] = &[
    TieBreakPredicate::SameBrand,
    TieBreakPredicate::SameProductType,
    TieBreakPredicate::BestSeller,
    TieBreakPredicate::Newest,
];

const PLATFORM_DEFAULTS: &[TieBreakPredicate] =
    &[TieBreakPredicate::BestSeller, TieBreakPredicate::Newest];

impl TieBreakPredicate {
    /// Active predicates of a tier, highest priority first
    pub fn for_tier(source: RecommendationSource) -> &'static [TieBreakPredicate] {
        match source {
            RecommendationSource::OrderHistory => ORDER_HISTORY,
            RecommendationSource::Wishlist => WISHLIST,
            RecommendationSource::BrowsingHistory => BROWSING_HISTORY,
            RecommendationSource::SearchHistory => SEARCH_HISTORY,
            RecommendationSource::PlatformDefaults => PLATFORM_DEFAULTS,
        }
    }

    pub fn compare(
        &self,
        a: &ProductCandidate,
        b: &ProductCandidate,
        hints: &AffinityHints,
    ) -> Ordering {
        match self {
            TieBreakPredicate::SameCategory => membership(Some(a.category_id), &hints.category_ids)
                .cmp(&membership(Some(b.category_id), &hints.category_ids)),
            TieBreakPredicate::SameBrand => membership(a.brand_id, &hints.brand_ids)
                .cmp(&membership(b.brand_id, &hints.brand_ids)),
            TieBreakPredicate::SameProductType => {
                membership(a.product_type_id, &hints.product_type_ids)
                    .cmp(&membership(b.product_type_id, &hints.product_type_ids))
            }
            TieBreakPredicate::BestSeller => b.is_best_seller.cmp(&a.is_best_seller),
            TieBreakPredicate::Newest => b.created_at.cmp(&a.created_at),
        }
    }
}

/// 0 when the id is hinted, 1 otherwise. An empty axis ranks everything 0.
fn membership(id: Option<Uuid>, hinted: &[Uuid]) -> u8 {
    if hinted.is_empty() {
        return 0;
    }
    match id {
        Some(id) if hinted.contains(&id) => 0,
        _ => 1,
    }
}

/// Orders candidates by the given predicates, then by id so the result is total
pub fn rank(
    mut candidates: Vec<ProductCandidate>,
    hints: &AffinityHints,
    predicates: &[TieBreakPredicate],
) -> Vec<ProductCandidate> {
    candidates.sort_by(|a, b| {
        predicates
            .iter()
            .fold(Ordering::Equal, |ordering, predicate| {
                ordering.then_with(|| predicate.compare(a, b, hints))
            })
            .then_with(|| a.id.cmp(&b.id))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn candidate(category: Uuid, brand: Option<Uuid>, best_seller: bool, age_days: i64) -> ProductCandidate {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        ProductCandidate {
            id: Uuid::new_v4(),
            name: "Product".to_string(),
            slug: "product".to_string(),
            category_id: category,
            sub_category_id: None,
            product_type_id: None,
            brand_id: brand,
            is_best_seller: best_seller,
            created_at: base - Duration::days(age_days),
            display: None,
        }
    }

    #[test]
    fn test_category_and_brand_beat_best_seller_and_recency() {
        let category = Uuid::new_v4();
        let brand = Uuid::new_v4();
        let other_brand = Uuid::new_v4();

        let mut hints = AffinityHints::default();
        hints.add_category(category);
        hints.add_brand(brand);

        let a = candidate(category, Some(brand), false, 300);
        let b = candidate(category, Some(other_brand), true, 1);

        let ranked = rank(
            vec![b.clone(), a.clone()],
            &hints,
            TieBreakPredicate::for_tier(RecommendationSource::Wishlist),
        );

        assert_eq!(ranked[0].id, a.id);
        assert_eq!(ranked[1].id, b.id);
    }

    #[test]
    fn test_category_match_outranks_brand_match() {
        let category = Uuid::new_v4();
        let brand = Uuid::new_v4();

        let mut hints = AffinityHints::default();
        hints.add_category(category);
        hints.add_brand(brand);

        let same_category = candidate(category, None, false, 10);
        let same_brand_only = candidate(Uuid::new_v4(), Some(brand), true, 0);

        let ranked = rank(
            vec![same_brand_only.clone(), same_category.clone()],
            &hints,
            TieBreakPredicate::for_tier(RecommendationSource::OrderHistory),
        );

        assert_eq!(ranked[0].id, same_category.id);
    }

    #[test]
    fn test_defaults_rank_best_sellers_then_newest() {
        let category = Uuid::new_v4();
        let old_best = candidate(category, None, true, 100);
        let new_best = candidate(category, None, true, 1);
        let newest_plain = candidate(category, None, false, 0);

        let ranked = rank(
            vec![newest_plain.clone(), old_best.clone(), new_best.clone()],
            &AffinityHints::default(),
            TieBreakPredicate::for_tier(RecommendationSource::PlatformDefaults),
        );

        let ids: Vec<Uuid> = ranked.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![new_best.id, old_best.id, newest_plain.id]);
    }

    #[test]
    fn test_empty_hint_axis_is_inactive() {
        let category = Uuid::new_v4();
        let older = candidate(category, Some(Uuid::new_v4()), false, 5);
        let newer = candidate(category, None, false, 1);

        // No brand hints: SameBrand must not favour the branded candidate
        let mut hints = AffinityHints::default();
        hints.add_category(category);

        let ranked = rank(
            vec![older.clone(), newer.clone()],
            &hints,
            TieBreakPredicate::for_tier(RecommendationSource::Wishlist),
        );
        assert_eq!(ranked[0].id, newer.id);
    }

    #[test]
    fn test_rank_is_deterministic_on_full_ties() {
        let category = Uuid::new_v4();
        let first = candidate(category, None, false, 3);
        let mut second = first.clone();
        second.id = Uuid::new_v4();

        let forward = rank(
            vec![first.clone(), second.clone()],
            &AffinityHints::default(),
            TieBreakPredicate::for_tier(RecommendationSource::PlatformDefaults),
        );
        let backward = rank(
            vec![second, first],
            &AffinityHints::default(),
            TieBreakPredicate::for_tier(RecommendationSource::PlatformDefaults),
        );

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_tier_predicate_sets() {
        assert!(!TieBreakPredicate::for_tier(RecommendationSource::SearchHistory)
            .contains(&TieBreakPredicate::SameCategory));
        assert!(!TieBreakPredicate::for_tier(RecommendationSource::Wishlist)
            .contains(&TieBreakPredicate::SameProductType));
        assert_eq!(
            TieBreakPredicate::for_tier(RecommendationSource::PlatformDefaults),
            &[TieBreakPredicate::BestSeller, TieBreakPredicate::Newest]
        );
    }
}
