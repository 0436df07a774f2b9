//! Redis connection pool for stream operations.
//!
//! Holds one multiplexed connection shared by every dispatch and
//! acknowledgment. Blocking reads of the incoming stream must not share it,
//! so the consumer takes a [`dedicated_connection`](RedisPool::dedicated_connection).

use redis::aio::MultiplexedConnection;
use redis::streams::StreamMaxlen;
use redis::{AsyncCommands, Client, RedisError, RedisResult};
use tokio::sync::RwLock;

use crate::config::RedisConfig;
use crate::metrics::RedisMetrics;

/// Error type for Redis pool operations.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Redis operation failed
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),
}

/// Redis connection pool for command traffic.
pub struct RedisPool {
    /// Redis client for creating connections
    client: Client,

    /// Multiplexed connection (shared across tasks)
    connection: RwLock<Option<MultiplexedConnection>>,
}

impl RedisPool {
    /// Create a new Redis pool. No connection is made until first use.
    pub fn new(config: RedisConfig) -> Result<Self, PoolError> {
        let client = Client::open(config.url.as_str())?;

        Ok(Self {
            client,
            connection: RwLock::new(None),
        })
    }

    /// Get the shared connection, establishing it if needed.
    pub async fn get_connection(&self) -> Result<MultiplexedConnection, PoolError> {
        {
            let conn = self.connection.read().await;
            if let Some(ref c) = *conn {
                return Ok(c.clone());
            }
        }

        self.connect().await
    }

    /// Open a connection that is not shared with command traffic.
    pub async fn dedicated_connection(&self) -> Result<MultiplexedConnection, PoolError> {
        self.client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(PoolError::from)
    }

    async fn connect(&self) -> Result<MultiplexedConnection, PoolError> {
        let mut conn_guard = self.connection.write().await;

        // Double-check in case another task connected while we waited
        if let Some(ref c) = *conn_guard {
            return Ok(c.clone());
        }

        match self.client.get_multiplexed_tokio_connection().await {
            Ok(conn) => {
                *conn_guard = Some(conn.clone());
                RedisMetrics::set_connected(true);
                tracing::info!("Redis pool connection established");
                Ok(conn)
            }
            Err(e) => {
                RedisMetrics::set_connected(false);
                tracing::error!(error = %e, "Failed to connect to Redis");
                Err(PoolError::Redis(e))
            }
        }
    }

    /// Run a command on the shared connection.
    ///
    /// Dropped connections and IO errors clear the cached connection so the
    /// next call reconnects.
    pub async fn execute<F, T, Fut>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: std::future::Future<Output = RedisResult<T>>,
    {
        let conn = self.get_connection().await?;

        match f(conn).await {
            Ok(result) => {
                RedisMetrics::set_connected(true);
                Ok(result)
            }
            Err(e) => {
                if e.is_connection_dropped() || e.is_io_error() {
                    let mut conn_guard = self.connection.write().await;
                    *conn_guard = None;
                    RedisMetrics::set_connected(false);
                }
                Err(PoolError::Redis(e))
            }
        }
    }

    /// Ping Redis to check connectivity.
    pub async fn ping(&self) -> Result<(), PoolError> {
        self.execute(|mut conn| async move {
            redis::cmd("PING").query_async::<String>(&mut conn).await
        })
        .await
        .map(|_| ())
    }
}

/// Typed stream helpers used by the channel backends.
#[async_trait::async_trait]
pub trait RedisPoolExt {
    /// Append an entry to a stream, trimming it to roughly `maxlen` entries.
    async fn xadd_maxlen(
        &self,
        key: &str,
        maxlen: usize,
        fields: &[(&str, &str)],
    ) -> Result<String, PoolError>;

    /// Acknowledge an entry for a consumer group and remove it from the stream.
    async fn xack_del(&self, key: &str, group: &str, id: &str) -> Result<(), PoolError>;

    /// Create a consumer group (and the stream) if it does not exist yet.
    async fn ensure_group(&self, key: &str, group: &str) -> Result<(), PoolError>;
}

#[async_trait::async_trait]
impl RedisPoolExt for RedisPool {
    async fn xadd_maxlen(
        &self,
        key: &str,
        maxlen: usize,
        fields: &[(&str, &str)],
    ) -> Result<String, PoolError> {
        self.execute(|mut conn| async move {
            conn.xadd_maxlen(key, StreamMaxlen::Approx(maxlen), "*", fields)
                .await
        })
        .await
    }

    async fn xack_del(&self, key: &str, group: &str, id: &str) -> Result<(), PoolError> {
        self.execute(|mut conn| async move {
            redis::pipe()
                .atomic()
                .xack(key, group, &[id])
                .ignore()
                .xdel(key, &[id])
                .ignore()
                .query_async::<()>(&mut conn)
                .await
        })
        .await
    }

    async fn ensure_group(&self, key: &str, group: &str) -> Result<(), PoolError> {
        let created = self
            .execute(|mut conn| async move {
                conn.xgroup_create_mkstream::<_, _, _, ()>(key, group, "0")
                    .await
            })
            .await;

        match created {
            Ok(()) => {
                tracing::info!(stream = %key, group = %group, "Created consumer group");
                Ok(())
            }
            Err(PoolError::Redis(e)) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e),
        }
    }
}
