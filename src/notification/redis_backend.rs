//! Redis Streams channel backend.
//!
//! Every logical channel resolves to a stream key through the
//! [`ChannelMap`]. Outbound payloads are appended as a single `body` field;
//! acknowledging an inbound entry acks it for the consumer group and
//! deletes it from the incoming stream.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ChannelMap;
use crate::error::{AckError, DispatchError};
use crate::redis::{RedisPool, RedisPoolExt};

use super::{AckToken, Acknowledger, ChannelDispatcher, ChannelIdentity};

/// Field name carrying the payload in every stream entry.
pub const BODY_FIELD: &str = "body";

/// Dispatcher appending payloads to Redis streams.
pub struct RedisStreamDispatcher {
    pool: Arc<RedisPool>,
    channels: ChannelMap,
    maxlen: usize,
}

impl RedisStreamDispatcher {
    pub fn new(pool: Arc<RedisPool>, channels: ChannelMap, maxlen: usize) -> Self {
        Self {
            pool,
            channels,
            maxlen,
        }
    }
}

#[async_trait]
impl ChannelDispatcher for RedisStreamDispatcher {
    async fn dispatch(&self, channel: ChannelIdentity, payload: &str) -> Result<(), DispatchError> {
        let key = self.channels.resolve(channel);

        let id = self
            .pool
            .xadd_maxlen(key, self.maxlen, &[(BODY_FIELD, payload)])
            .await
            .map_err(|e| DispatchError::Transport {
                channel,
                reason: e.to_string(),
            })?;

        tracing::debug!(channel = %channel, stream = %key, entry_id = %id, "Payload dispatched");
        Ok(())
    }
}

/// Acknowledger removing entries from the incoming stream.
pub struct RedisStreamAcknowledger {
    pool: Arc<RedisPool>,
    stream: String,
    group: String,
}

impl RedisStreamAcknowledger {
    pub fn new(pool: Arc<RedisPool>, channels: &ChannelMap, group: impl Into<String>) -> Self {
        Self {
            pool,
            stream: channels.resolve(ChannelIdentity::Incoming).to_string(),
            group: group.into(),
        }
    }
}

#[async_trait]
impl Acknowledger for RedisStreamAcknowledger {
    async fn acknowledge(&self, token: AckToken) -> Result<(), AckError> {
        self.pool
            .xack_del(&self.stream, &self.group, token.as_str())
            .await
            .map_err(|e| AckError::Transport {
                token: token.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(stream = %self.stream, entry_id = %token, "Notification acknowledged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedisConfig;

    fn unreachable_pool() -> Arc<RedisPool> {
        // Port 1 is never a Redis server; connecting fails fast
        let config = RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            ..RedisConfig::default()
        };
        Arc::new(RedisPool::new(config).unwrap())
    }

    fn channels() -> ChannelMap {
        ChannelMap::new("posts:incoming", "posts:notifier", "posts:webmention").unwrap()
    }

    #[test]
    fn test_acknowledger_targets_incoming_stream() {
        let ack = RedisStreamAcknowledger::new(unreachable_pool(), &channels(), "dispatchers");
        assert_eq!(ack.stream, "posts:incoming");
        assert_eq!(ack.group, "dispatchers");
    }

    #[tokio::test]
    async fn test_dispatch_failure_names_channel() {
        let dispatcher = RedisStreamDispatcher::new(unreachable_pool(), channels(), 100);

        let err = dispatcher
            .dispatch(ChannelIdentity::Webmention, "{}")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Transport { channel: ChannelIdentity::Webmention, .. }
        ));
    }

    #[tokio::test]
    async fn test_ack_failure_keeps_token() {
        let ack = RedisStreamAcknowledger::new(unreachable_pool(), &channels(), "dispatchers");

        let err = ack.acknowledge(AckToken::new("1-0")).await.unwrap_err();
        assert!(err.to_string().contains("1-0"));
    }
}
