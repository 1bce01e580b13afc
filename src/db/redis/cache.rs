use std::collections::HashMap;
use std::fmt::Display;

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use redis::Client;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A resolved media record
    Media(Uuid),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Media(id) => write!(f, "media:{}", id),
        }
    }
}

/// Creates a Redis client for caching
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

/// Read-through cache in front of the media service
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task to flush pending writes and stop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a new Cache and spawns its background write task.
    ///
    /// Writes never block the request path; they are queued and applied by
    /// the writer task.
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            CacheWriter::new(client).run(write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        (cache, CacheWriterHandle { shutdown_tx })
    }

    /// Fetches every key with one `MGET` over a single connection.
    ///
    /// Misses and entries that no longer deserialize are left out of the map.
    pub async fn get_many<T: serde::de::DeserializeOwned>(
        &self,
        keys: &[CacheKey],
    ) -> AppResult<HashMap<CacheKey, T>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let names: Vec<String> = keys.iter().map(CacheKey::to_string).collect();
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&names)
            .query_async(&mut conn)
            .await?;

        let mut found = HashMap::new();
        for (key, value) in keys.iter().zip(values) {
            let Some(json) = value else { continue };
            match serde_json::from_str(&json) {
                Ok(data) => {
                    found.insert(key.clone(), data);
                }
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Discarding undecodable cache entry");
                }
            }
        }

        Ok(found)
    }

    /// Queues a write for the background task and returns immediately
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

/// Background writer holding one reused connection
struct CacheWriter {
    client: Client,
    conn: Option<MultiplexedConnection>,
    failed_writes: u64,
}

impl CacheWriter {
    fn new(client: Client) -> Self {
        Self {
            client,
            conn: None,
            failed_writes: 0,
        }
    }

    async fn run(
        mut self,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => self.write(msg).await,
                _ = shutdown_rx.recv() => {
                    tracing::info!("Cache writer shutting down, flushing remaining writes");

                    // Senders may still be alive; drain what is queued right now
                    while let Ok(msg) = write_rx.try_recv() {
                        self.write(msg).await;
                    }

                    tracing::info!(failed_writes = self.failed_writes, "Cache writer task stopped");
                    break;
                }
            }
        }
    }

    async fn write(&mut self, msg: CacheWriteMessage) {
        if let Err(e) = self.try_write(msg).await {
            self.failed_writes += 1;
            tracing::error!(
                error = %e,
                failed_writes = self.failed_writes,
                "Failed to write to Redis cache"
            );
        }
    }

    /// A connection that errored is dropped and reopened on the next write
    async fn try_write(&mut self, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = match self.conn.take() {
            Some(conn) => conn,
            None => self.client.get_multiplexed_async_connection().await?,
        };
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        self.conn = Some(conn);
        Ok(())
    }
}
