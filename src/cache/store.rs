use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Description(String),
    Price(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Description(name) => write!(f, "describe:{}", name.trim().to_lowercase()),
            CacheKey::Price(name) => write!(f, "price:{}", name.trim().to_lowercase()),
        }
    }
}

/// Creates a Redis client for caching lookups
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Cache handler for storing and retrieving lookup results from Redis
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task to flush queued writes and waits until it has stopped
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
    }
}

impl Cache {
    /// Connects to Redis and starts the background writer task
    ///
    /// Writes are queued on a channel so a lookup never waits on Redis to store its result.
    pub async fn new(redis_client: Client) -> AppResult<(Self, CacheWriterHandle)> {
        let connection = ConnectionManager::new(redis_client).await?;
        let (write_tx, write_rx) = mpsc::unbounded_channel();

        let writer_conn = connection.clone();
        let handle = spawn_writer(write_rx, move |msg| {
            let mut conn = writer_conn.clone();
            async move { write_to_redis(&mut conn, msg).await }
        });

        let cache = Self {
            connection,
            write_tx,
        };

        Ok((cache, handle))
    }

    /// Retrieves and deserializes a cached value, `None` on a miss
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.connection.clone();
        let cached: Option<String> = conn.get(key.to_string()).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Queues a value for storage without waiting for the write
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}

async fn write_to_redis(conn: &mut ConnectionManager, msg: CacheWriteMessage) -> AppResult<()> {
    let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
    Ok(())
}

fn spawn_writer<F, Fut>(
    write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
    write: F,
) -> CacheWriterHandle
where
    F: FnMut(CacheWriteMessage) -> Fut + Send + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let task = tokio::spawn(cache_writer_task(write_rx, shutdown_rx, write));
    CacheWriterHandle { shutdown_tx, task }
}

async fn cache_writer_task<F, Fut>(
    mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
    mut shutdown_rx: mpsc::Receiver<()>,
    mut write: F,
) where
    F: FnMut(CacheWriteMessage) -> Fut,
    Fut: Future<Output = AppResult<()>>,
{
    tracing::info!("Cache writer task started");

    loop {
        tokio::select! {
            Some(msg) = write_rx.recv() => {
                if let Err(e) = write(msg).await {
                    tracing::error!(error = %e, "Failed to write to Redis cache");
                }
            }
            _ = shutdown_rx.recv() => {
                // Senders live as long as any Cache clone, so drain without waiting.
                let mut flushed = 0;
                while let Ok(msg) = write_rx.try_recv() {
                    if let Err(e) = write(msg).await {
                        tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                    }
                    flushed += 1;
                }

                tracing::info!(flushed, "Cache writer task stopped");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    #[test]
    fn test_cache_key_display_description() {
        let key = CacheKey::Description("Hollow Knight".to_string());
        assert_eq!(key.to_string(), "describe:hollow knight");
    }

    #[test]
    fn test_cache_key_display_price_normalizes() {
        let key = CacheKey::Price("  STARDEW VALLEY ".to_string());
        assert_eq!(key.to_string(), "price:stardew valley");
    }

    #[test]
    fn test_cache_keys_do_not_collide() {
        let describe = CacheKey::Description("Hades".to_string());
        let price = CacheKey::Price("Hades".to_string());
        assert_ne!(describe.to_string(), price.to_string());
    }

    fn message(key: &str) -> CacheWriteMessage {
        CacheWriteMessage {
            key: key.to_string(),
            value: "[]".to_string(),
            ttl: 60,
        }
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_queued_writes() {
        let written = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        for key in ["a", "b", "c"] {
            write_tx.send(message(key)).unwrap();
        }

        let sink = written.clone();
        let handle = spawn_writer(write_rx, move |msg| {
            let sink = sink.clone();
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                sink.lock().unwrap().push(msg.key);
                Ok(())
            }
        });

        handle.shutdown().await;

        assert_eq!(*written.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_writer() {
        let written = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        write_tx.send(message("bad")).unwrap();
        write_tx.send(message("good")).unwrap();

        let sink = written.clone();
        let handle = spawn_writer(write_rx, move |msg| {
            let sink = sink.clone();
            async move {
                if msg.key == "bad" {
                    return Err(AppError::Internal("redis unavailable".to_string()));
                }
                sink.lock().unwrap().push(msg.key);
                Ok(())
            }
        });

        handle.shutdown().await;

        assert_eq!(*written.lock().unwrap(), vec!["good"]);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_cache_miss() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(client).await.unwrap();

        let key = CacheKey::Description("nonexistent_game_12345".to_string());
        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();

        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_set_in_background_writes_to_cache() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(client.clone()).await.unwrap();

        let key = CacheKey::Price("test_async_write".to_string());
        let value = vec!["item1".to_string(), "item2".to_string()];

        cache.set_in_background(&key, &value, 60);
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_cache_writer_graceful_shutdown() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, handle) = Cache::new(client.clone()).await.unwrap();

        let key = CacheKey::Description("test_shutdown".to_string());
        let value = vec!["shutdown_test".to_string()];

        cache.set_in_background(&key, &value, 60);
        handle.shutdown().await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }
}
