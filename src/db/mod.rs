pub mod catalog;
pub mod memory;
pub mod postgres;
pub mod redis;
pub mod signals;
pub mod store;

pub use catalog::PgCatalogStore;
pub use memory::InMemoryStore;
pub use postgres::{create_pool, run_migrations};
pub use redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
pub use signals::PgSignalStore;
pub use store::{CandidateFilter, CatalogQuery, CatalogStore, SignalStore};
