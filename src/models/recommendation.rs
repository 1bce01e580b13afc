use std::collections::HashSet;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AffinityHints, ProductCandidate};
use crate::{
    config::CascadeConfig,
    error::{AppError, AppResult},
};

/// Tier that produced a recommendation list
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    OrderHistory,
    Wishlist,
    BrowsingHistory,
    SearchHistory,
    PlatformDefaults,
}

impl RecommendationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationSource::OrderHistory => "order_history",
            RecommendationSource::Wishlist => "wishlist",
            RecommendationSource::BrowsingHistory => "browsing_history",
            RecommendationSource::SearchHistory => "search_history",
            RecommendationSource::PlatformDefaults => "platform_defaults",
        }
    }
}

impl Display for RecommendationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw parameters as received from a caller
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationParams {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub exclude_product_ids: Vec<Uuid>,
}

/// Validated input to one cascade run
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRequest {
    pub user_id: Option<Uuid>,
    pub limit: usize,
    pub exclude_product_ids: HashSet<Uuid>,
}

impl RecommendationRequest {
    /// Validates caller parameters.
    ///
    /// A missing or zero limit falls back to the configured default, a
    /// negative one is rejected and anything above `max_limit` is clamped.
    pub fn from_params(params: RecommendationParams, config: &CascadeConfig) -> AppResult<Self> {
        let limit = match params.limit {
            None | Some(0) => config.default_limit,
            Some(limit) if limit < 0 => {
                return Err(AppError::InvalidInput(format!(
                    "limit must not be negative, got {}",
                    limit
                )));
            }
            Some(limit) => {
                let requested = usize::try_from(limit).unwrap_or(usize::MAX);
                if requested > config.max_limit {
                    tracing::debug!(
                        requested = requested,
                        max_limit = config.max_limit,
                        "Clamping recommendation limit"
                    );
                }
                requested.min(config.max_limit)
            }
        };

        Ok(Self {
            user_id: params.user_id,
            limit,
            exclude_product_ids: params.exclude_product_ids.into_iter().collect(),
        })
    }
}

/// First identifiers that influenced the chosen tier
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecommendationMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type_id: Option<Uuid>,
}

impl RecommendationMetadata {
    /// Returns `None` when the hints carry no identifier at all
    pub fn from_hints(hints: &AffinityHints) -> Option<Self> {
        let metadata = Self {
            category_id: hints.category_ids.first().copied(),
            brand_id: hints.brand_ids.first().copied(),
            product_type_id: hints.product_type_ids.first().copied(),
        };

        if metadata == Self::default() {
            None
        } else {
            Some(metadata)
        }
    }
}

/// Response of the recommendation engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResult {
    pub products: Vec<ProductCandidate>,
    pub source: RecommendationSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecommendationMetadata>,
}
