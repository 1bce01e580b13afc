pub mod product;
pub mod recommendation;
pub mod signal;

pub use product::{
    MediaAttachment, MediaRecord, ProductCandidate, ProductDisplay, ProductPolicy,
    VariantDisplay, VerificationStatus,
};
pub use recommendation::{
    RecommendationMetadata, RecommendationParams, RecommendationRequest, RecommendationResult,
    RecommendationSource,
};
pub use signal::{
    AffinityHints, BrowsingEventKind, OrderStatus, SearchMatch, SignalExtraction, SignalProduct,
};
