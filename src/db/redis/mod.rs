pub mod cache;
#[cfg(test)]
pub(crate) mod testing;

pub use cache::create_redis_client;
pub use cache::Cache;
pub use cache::CacheKey;
pub use cache::CacheWriterHandle;
