pub mod cascade;
pub mod defaults;
pub mod enrichment;
pub mod exclusion;
pub mod media;
pub mod ranker;
pub mod recommendations;
pub mod selector;
pub mod signals;

pub use recommendations::RecommendationEngine;
