use crate::{
    error::AppResult,
    models::{AffinityHints, ProductCandidate, RecommendationSource},
    services::{exclusion::ExclusionSet, selector::CandidateSelector},
};

/// Terminal tier: best-sellers, then newest, over the whole catalog
#[derive(Clone)]
pub struct PlatformDefaults {
    selector: CandidateSelector,
}

impl PlatformDefaults {
    pub fn new(selector: CandidateSelector) -> Self {
        Self { selector }
    }

    /// Errors here are not recoverable; there is no tier left to fall back to
    pub async fn defaults(
        &self,
        exclusions: &ExclusionSet,
        limit: usize,
    ) -> AppResult<Vec<ProductCandidate>> {
        self.selector
            .select(
                RecommendationSource::PlatformDefaults,
                &AffinityHints::default(),
                exclusions,
                limit,
            )
            .await
    }
}
