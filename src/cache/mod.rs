mod macros;
pub mod store;

pub use store::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
