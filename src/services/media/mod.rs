//! Media service abstraction
//!
//! The engine hands the deduplicated media ids of an accepted list to a
//! resolver: the HTTP client in `http`, or the in-memory store in tests.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{error::AppResult, models::MediaRecord};

pub mod http;

pub use http::HttpMediaResolver;

/// Batched lookup of media records by id
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MediaResolver: Send + Sync {
    /// Resolves every id in one call; unknown ids are simply absent from the map
    async fn resolve_media(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, MediaRecord>>;

    /// Resolver name for logging
    fn name(&self) -> &'static str;
}
