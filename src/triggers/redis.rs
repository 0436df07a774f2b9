use std::sync::Arc;
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::streams::{
    StreamAutoClaimOptions, StreamAutoClaimReply, StreamId, StreamReadOptions, StreamReadReply,
};
use redis::{AsyncCommands, RedisResult};
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::config::{ChannelMap, ConsumerConfig};
use crate::metrics::ConsumerMetrics;
use crate::notification::{AckToken, ChannelIdentity, Processor, BODY_FIELD};
use crate::redis::{BackoffConfig, ExponentialBackoff, PoolError, RedisPool, RedisPoolExt};

/// Start of the pending entries list, used as the initial claim cursor.
const CLAIM_START: &str = "0-0";

/// Consumer-group reader for the incoming stream.
///
/// Entries are handed to the [`Processor`] one at a time. Entries the
/// processor fails on stay pending and are claimed again once they have
/// been idle for `claim_idle_ms`.
pub struct IncomingConsumer {
    pool: Arc<RedisPool>,
    processor: Arc<Processor>,
    stream: String,
    consumer: ConsumerConfig,
    backoff: BackoffConfig,
    shutdown: broadcast::Sender<()>,
}

impl IncomingConsumer {
    pub fn new(
        pool: Arc<RedisPool>,
        processor: Arc<Processor>,
        channels: &ChannelMap,
        consumer: ConsumerConfig,
        backoff: BackoffConfig,
    ) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            pool,
            processor,
            stream: channels.resolve(ChannelIdentity::Incoming).to_string(),
            consumer,
            backoff,
            shutdown,
        }
    }

    /// Get a shutdown signal sender
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Consume until a shutdown signal arrives, reconnecting on failure.
    pub async fn start(&self) -> anyhow::Result<()> {
        tracing::info!(
            stream = %self.stream,
            group = %self.consumer.group,
            consumer = %self.consumer.name,
            "Starting incoming consumer"
        );

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut backoff = ExponentialBackoff::new(self.backoff.clone());

        loop {
            match self.run_consume_loop(&mut shutdown_rx, &mut backoff).await {
                Ok(()) => {
                    tracing::info!("Incoming consumer stopped gracefully");
                    break;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::error!(
                        error = %e,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "Incoming consumer error, reconnecting"
                    );

                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            tracing::info!("Received shutdown signal while reconnecting");
                            break;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        Ok(())
    }

    async fn run_consume_loop(
        &self,
        shutdown_rx: &mut broadcast::Receiver<()>,
        backoff: &mut ExponentialBackoff,
    ) -> anyhow::Result<()> {
        self.pool
            .ensure_group(&self.stream, &self.consumer.group)
            .await?;
        let mut conn = self.pool.dedicated_connection().await?;
        backoff.reset();

        tracing::info!(stream = %self.stream, "Incoming consumer connected");

        let claim_interval = Duration::from_millis(self.consumer.claim_interval_ms);
        let mut claim_cursor = CLAIM_START.to_string();
        let mut last_claim = Instant::now();

        loop {
            if last_claim.elapsed() >= claim_interval {
                claim_cursor = self.reclaim(claim_cursor).await?;
                last_claim = Instant::now();
            }

            // Entries delivered to a read cancelled here stay pending and
            // are picked up by a later claim.
            let entries = tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Received shutdown signal");
                    return Ok(());
                }
                entries = self.read_batch(&mut conn) => entries?,
            };

            if !entries.is_empty() {
                ConsumerMetrics::record_received(entries.len());
            }

            for entry in entries {
                self.handle_entry(entry).await;
            }
        }
    }

    async fn read_batch(&self, conn: &mut MultiplexedConnection) -> RedisResult<Vec<StreamId>> {
        let options = StreamReadOptions::default()
            .group(&self.consumer.group, &self.consumer.name)
            .count(self.consumer.batch_size)
            .block(self.consumer.block_ms as usize);

        let reply: Option<StreamReadReply> = conn
            .xread_options(&[self.stream.as_str()], &[">"], &options)
            .await?;

        Ok(reply
            .map(|r| r.keys.into_iter().flat_map(|key| key.ids).collect())
            .unwrap_or_default())
    }

    /// Claim and process entries another read left pending for too long.
    ///
    /// Returns the cursor for the next claim.
    async fn reclaim(&self, cursor: String) -> Result<String, PoolError> {
        let stream = self.stream.as_str();
        let group = self.consumer.group.as_str();
        let name = self.consumer.name.as_str();
        let min_idle = self.consumer.claim_idle_ms;
        let options = StreamAutoClaimOptions::default().count(self.consumer.batch_size);

        let reply: StreamAutoClaimReply = self
            .pool
            .execute(|mut conn| async move {
                conn.xautoclaim_options(stream, group, name, min_idle, cursor, options)
                    .await
            })
            .await?;

        if !reply.deleted_ids.is_empty() {
            tracing::warn!(
                count = reply.deleted_ids.len(),
                "Pending entries no longer exist in the stream"
            );
        }

        if !reply.claimed.is_empty() {
            tracing::info!(count = reply.claimed.len(), "Redelivering pending notifications");
            ConsumerMetrics::record_redelivered(reply.claimed.len());
        }

        for entry in reply.claimed {
            self.handle_entry(entry).await;
        }

        Ok(reply.next_stream_id)
    }

    async fn handle_entry(&self, entry: StreamId) {
        let token = AckToken::new(entry.id.as_str());

        match entry_body(&entry) {
            Some(body) => {
                // Failures are logged by the processor; the entry stays pending
                let _ = self.processor.process(&body, token).await;
            }
            None => self.drop_entry(token).await,
        }
    }

    /// Remove an entry that can never be processed.
    async fn drop_entry(&self, token: AckToken) {
        tracing::warn!(
            entry_id = %token,
            field = BODY_FIELD,
            "Incoming entry has no body, dropping"
        );
        ConsumerMetrics::record_dropped();

        if let Err(e) = self
            .pool
            .xack_del(&self.stream, &self.consumer.group, token.as_str())
            .await
        {
            tracing::error!(entry_id = %token, error = %e, "Failed to drop incoming entry");
        }
    }
}

fn entry_body(entry: &StreamId) -> Option<String> {
    entry.get::<String>(BODY_FIELD)
}
