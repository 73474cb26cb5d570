/// Wraps a lookup with an optional Redis cache.
///
/// `$cache` is an `Option<Cache>`. With no cache the block simply runs. With a cache, a hit is
/// returned directly; a miss runs the block and queues the result for storage. A failing cache
/// read is logged and treated as a miss, so Redis outages never fail a lookup.
///
/// # Arguments
/// * `$cache`: `Option<Cache>` to read from and write to.
/// * `$key`: the `CacheKey` for this lookup.
/// * `$ttl`: time-to-live for stored values, in seconds.
/// * `$block`: future producing `AppResult<T>` on a miss.
///
/// # Example
/// ```rust,ignore
/// cached!(self.cache, CacheKey::Price(name.to_string()), PRICE_CACHE_TTL, async move {
///     fetch_price(name).await
/// })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache.as_ref() {
            Some(cache) => {
                let key = $key;
                let hit = match cache.get_from_cache(&key).await {
                    Ok(hit) => hit,
                    Err(e) => {
                        tracing::warn!(error = %e, key = %key, "Cache read failed, treating as miss");
                        None
                    }
                };

                match hit {
                    Some(value) => {
                        tracing::debug!(key = %key, "Cache hit");
                        Ok(value)
                    }
                    None => {
                        let value = $block.await?;
                        cache.set_in_background(&key, &value, $ttl);
                        Ok(value)
                    }
                }
            }
            None => $block.await,
        }
    }};
}
