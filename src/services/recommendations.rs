use std::sync::Arc;

use uuid::Uuid;

use crate::{
    config::CascadeConfig,
    db::{CatalogStore, SignalStore},
    error::{AppError, AppResult},
    models::{
        AffinityHints, ProductCandidate, RecommendationMetadata, RecommendationParams,
        RecommendationRequest, RecommendationResult, RecommendationSource, SignalExtraction,
    },
    services::{
        cascade::{transition, CascadeEvent, CascadeState},
        defaults::PlatformDefaults,
        enrichment::Enricher,
        exclusion::ExclusionSet,
        media::MediaResolver,
        selector::CandidateSelector,
        signals::{
            BrowsingHistoryExtractor, OrderHistoryExtractor, SearchHistoryExtractor,
            SignalExtractor, WishlistExtractor,
        },
    },
};

/// Candidates a tier produced and the hints that shaped them
#[derive(Debug, Default)]
struct TierOutcome {
    candidates: Vec<ProductCandidate>,
    hints: AffinityHints,
}

/// Runs the recommendation cascade for one request at a time.
///
/// Holds no per-request state, so one engine is shared across all requests.
pub struct RecommendationEngine {
    config: CascadeConfig,
    order_history: OrderHistoryExtractor,
    wishlist: WishlistExtractor,
    browsing: BrowsingHistoryExtractor,
    search: SearchHistoryExtractor,
    selector: CandidateSelector,
    defaults: PlatformDefaults,
    enricher: Enricher,
}

impl RecommendationEngine {
    pub fn new(
        config: CascadeConfig,
        signals: Arc<dyn SignalStore>,
        catalog: Arc<dyn CatalogStore>,
        media: Arc<dyn MediaResolver>,
    ) -> Self {
        let selector = CandidateSelector::new(catalog.clone());

        Self {
            order_history: OrderHistoryExtractor::new(
                signals.clone(),
                config.qualifying_order_statuses.clone(),
                config.order_history_window,
            ),
            wishlist: WishlistExtractor::new(signals.clone(), config.wishlist_window),
            browsing: BrowsingHistoryExtractor::new(signals.clone(), config.browsing_window),
            search: SearchHistoryExtractor::new(signals, config.search_window),
            defaults: PlatformDefaults::new(selector.clone()),
            selector,
            enricher: Enricher::new(catalog, media, config.enrichment_timeout),
            config,
        }
    }

    /// Validates caller parameters and runs the cascade
    pub async fn get_recommendations(
        &self,
        params: RecommendationParams,
    ) -> AppResult<RecommendationResult> {
        let request = RecommendationRequest::from_params(params, &self.config)?;
        self.recommend(request).await
    }

    pub async fn recommend(&self, request: RecommendationRequest) -> AppResult<RecommendationResult> {
        let limit = request.limit;
        let mut exclusions =
            ExclusionSet::build(request.exclude_product_ids.iter().copied(), Vec::new());
        let mut prefetched_orders: Option<SignalExtraction> = None;
        let mut outcome = TierOutcome::default();
        let mut state = CascadeState::Start;

        tracing::debug!(
            user_id = ?request.user_id,
            limit,
            caller_exclusions = exclusions.len(),
            "Starting recommendation cascade"
        );

        let source = loop {
            let event = match (state, request.user_id) {
                (CascadeState::Done(source), _) => break source,
                (CascadeState::Start, None) => CascadeEvent::UserAbsent,
                (CascadeState::Start, Some(user_id)) => {
                    let (has_orders, extraction) = self.check_orders(user_id).await;
                    prefetched_orders = extraction;
                    CascadeEvent::OrdersChecked { has_orders }
                }
                (CascadeState::PlatformDefaults, _) => {
                    outcome = TierOutcome {
                        candidates: self.run_defaults(&exclusions, limit).await?,
                        hints: AffinityHints::default(),
                    };
                    CascadeEvent::TierCompleted {
                        produced: outcome.candidates.len(),
                    }
                }
                (CascadeState::OrderHistory, Some(_)) => {
                    outcome = match prefetched_orders.take() {
                        Some(extraction) => {
                            self.select_for_tier(
                                RecommendationSource::OrderHistory,
                                extraction,
                                &mut exclusions,
                                limit,
                            )
                            .await
                        }
                        None => TierOutcome::default(),
                    };
                    CascadeEvent::TierCompleted {
                        produced: outcome.candidates.len(),
                    }
                }
                (signal_state, Some(user_id)) => {
                    let extractor: &dyn SignalExtractor = match signal_state {
                        CascadeState::Wishlist => &self.wishlist,
                        CascadeState::BrowsingHistory => &self.browsing,
                        _ => &self.search,
                    };
                    outcome = self
                        .run_signal_tier(extractor, user_id, &mut exclusions, limit)
                        .await;
                    CascadeEvent::TierCompleted {
                        produced: outcome.candidates.len(),
                    }
                }
                (signal_state, None) => {
                    return Err(AppError::Internal(format!(
                        "cascade reached {:?} without a user",
                        signal_state
                    )));
                }
            };

            state = transition(state, event, &self.config);
        };

        let metadata = match source {
            RecommendationSource::PlatformDefaults => None,
            _ => RecommendationMetadata::from_hints(&outcome.hints),
        };
        let products = self.enricher.enrich(outcome.candidates).await;

        tracing::info!(
            user_id = ?request.user_id,
            source = %source,
            count = products.len(),
            "Recommendations served"
        );

        Ok(RecommendationResult {
            products,
            source,
            metadata,
        })
    }

    /// Existence check and order extraction, issued together.
    ///
    /// A failed check reads as "no orders"; a failed extraction as `None`.
    async fn check_orders(&self, user_id: Uuid) -> (bool, Option<SignalExtraction>) {
        let timeout = self.config.tier_timeout;
        let (exists, extraction) = tokio::join!(
            tokio::time::timeout(timeout, self.order_history.has_qualifying_orders(user_id)),
            tokio::time::timeout(timeout, self.order_history.extract(user_id)),
        );

        let has_orders = match exists {
            Ok(Ok(has_orders)) => has_orders,
            Ok(Err(e)) => {
                tracing::warn!(user_id = %user_id, error = %e, "Order existence check failed");
                false
            }
            Err(_) => {
                tracing::warn!(user_id = %user_id, "Order existence check timed out");
                false
            }
        };

        let extraction = match extraction {
            Ok(Ok(extraction)) => Some(extraction),
            Ok(Err(e)) => {
                tracing::warn!(user_id = %user_id, error = %e, "Order history read failed");
                None
            }
            Err(_) => {
                tracing::warn!(user_id = %user_id, "Order history read timed out");
                None
            }
        };

        (has_orders, extraction)
    }

    async fn run_signal_tier(
        &self,
        extractor: &dyn SignalExtractor,
        user_id: Uuid,
        exclusions: &mut ExclusionSet,
        limit: usize,
    ) -> TierOutcome {
        let source = extractor.source();
        tracing::debug!(user_id = %user_id, tier = %source, "Trying tier");

        let extraction =
            match tokio::time::timeout(self.config.tier_timeout, extractor.extract(user_id)).await {
                Ok(Ok(extraction)) => extraction,
                Ok(Err(e)) => {
                    tracing::warn!(
                        user_id = %user_id,
                        tier = %source,
                        error = %e,
                        "Signal read failed, skipping tier"
                    );
                    return TierOutcome::default();
                }
                Err(_) => {
                    tracing::warn!(
                        user_id = %user_id,
                        tier = %source,
                        "Signal read timed out, skipping tier"
                    );
                    return TierOutcome::default();
                }
            };

        self.select_for_tier(source, extraction, exclusions, limit).await
    }

    /// Selection step shared by every signal tier
    async fn select_for_tier(
        &self,
        source: RecommendationSource,
        extraction: SignalExtraction,
        exclusions: &mut ExclusionSet,
        limit: usize,
    ) -> TierOutcome {
        if !extraction.sufficient_evidence {
            tracing::debug!(tier = %source, "No signal, skipping selection");
            return TierOutcome::default();
        }

        exclusions.extend(extraction.implicated.iter().copied());

        let hints = extraction.hints;
        let selection = tokio::time::timeout(
            self.config.tier_timeout,
            self.selector.select(source, &hints, exclusions, limit),
        )
        .await;

        let candidates = match selection {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(e)) => {
                tracing::warn!(
                    tier = %source,
                    error = %e,
                    "Candidate selection failed, treating tier as empty"
                );
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(
                    tier = %source,
                    "Candidate selection timed out, treating tier as empty"
                );
                Vec::new()
            }
        };

        tracing::debug!(
            tier = %source,
            produced = candidates.len(),
            excluded = exclusions.len(),
            "Tier completed"
        );

        TierOutcome { candidates, hints }
    }

    async fn run_defaults(
        &self,
        exclusions: &ExclusionSet,
        limit: usize,
    ) -> AppResult<Vec<ProductCandidate>> {
        match tokio::time::timeout(self.config.tier_timeout, self.defaults.defaults(exclusions, limit))
            .await
        {
            Ok(Ok(candidates)) => Ok(candidates),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Platform defaults failed");
                Err(e)
            }
            Err(_) => {
                tracing::error!(
                    timeout_ms = self.config.tier_timeout.as_millis() as u64,
                    "Platform defaults timed out"
                );
                Err(AppError::Timeout(format!(
                    "platform defaults exceeded {}ms",
                    self.config.tier_timeout.as_millis()
                )))
            }
        }
    }
}
