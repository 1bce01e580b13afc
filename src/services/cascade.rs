//! Cascade state machine
//!
//! The engine drives I/O; which tier runs next is decided here alone.

use crate::{config::CascadeConfig, models::RecommendationSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeState {
    Start,
    OrderHistory,
    Wishlist,
    BrowsingHistory,
    SearchHistory,
    PlatformDefaults,
    Done(RecommendationSource),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeEvent {
    /// The request carried no user id
    UserAbsent,
    /// Result of the qualifying-orders existence check
    OrdersChecked { has_orders: bool },
    /// The current tier finished selecting (a failed tier produced 0)
    TierCompleted { produced: usize },
}

/// Next state for an event.
///
/// Events that make no sense in the current state leave it unchanged.
pub fn transition(state: CascadeState, event: CascadeEvent, config: &CascadeConfig) -> CascadeState {
    use CascadeEvent::*;
    use CascadeState::*;

    match (state, event) {
        (Start, UserAbsent) => PlatformDefaults,
        (Start, OrdersChecked { has_orders: true }) => OrderHistory,
        (Start, OrdersChecked { has_orders: false }) => Wishlist,

        (OrderHistory, TierCompleted { produced }) => {
            if produced > 0 || !config.order_history_empty_fallback {
                Done(RecommendationSource::OrderHistory)
            } else {
                PlatformDefaults
            }
        }

        (Wishlist, TierCompleted { produced }) if produced >= config.acceptance_threshold => {
            Done(RecommendationSource::Wishlist)
        }
        (Wishlist, TierCompleted { .. }) => BrowsingHistory,

        (BrowsingHistory, TierCompleted { produced }) if produced >= config.acceptance_threshold => {
            Done(RecommendationSource::BrowsingHistory)
        }
        (BrowsingHistory, TierCompleted { .. }) => SearchHistory,

        (SearchHistory, TierCompleted { produced }) if produced >= config.acceptance_threshold => {
            Done(RecommendationSource::SearchHistory)
        }
        (SearchHistory, TierCompleted { .. }) => PlatformDefaults,

        (PlatformDefaults, TierCompleted { .. }) => Done(RecommendationSource::PlatformDefaults),

        (state, _) => state,
    }
}
