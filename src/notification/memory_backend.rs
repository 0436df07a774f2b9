//! In-memory channel and fetcher backends.
//!
//! Everything is kept in process memory and lost on restart. These back
//! the pipeline in tests and in local runs without Redis, and support
//! failure injection to exercise the abort paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::{AckError, DispatchError, FetchError};

use super::{AckToken, Acknowledger, ChannelDispatcher, ChannelIdentity, DocumentFetcher};

/// In-memory channels implementing both the dispatch and acknowledge ports.
#[derive(Default)]
pub struct MemoryChannels {
    /// Successfully delivered payloads per channel, in delivery order
    delivered: DashMap<ChannelIdentity, Vec<String>>,
    /// Delivery attempts per channel, including failed ones
    attempts: DashMap<ChannelIdentity, usize>,
    /// Channel -> 1-based attempt number that should fail
    fail_on_attempt: DashMap<ChannelIdentity, usize>,
    /// Acknowledgment count per token
    acknowledged: DashMap<String, usize>,
    fail_ack: AtomicBool,
}

impl MemoryChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `attempt`-th dispatch (1-based) to `channel` fail.
    pub fn fail_dispatch_on(&self, channel: ChannelIdentity, attempt: usize) {
        self.fail_on_attempt.insert(channel, attempt);
    }

    /// Make every acknowledgment fail.
    pub fn fail_acknowledgments(&self, fail: bool) {
        self.fail_ack.store(fail, Ordering::SeqCst);
    }

    /// Payloads delivered to `channel`, in order.
    pub fn delivered(&self, channel: ChannelIdentity) -> Vec<String> {
        self.delivered
            .get(&channel)
            .map(|payloads| payloads.clone())
            .unwrap_or_default()
    }

    /// Number of dispatch attempts made to `channel`.
    pub fn attempts(&self, channel: ChannelIdentity) -> usize {
        self.attempts.get(&channel).map(|n| *n).unwrap_or(0)
    }

    /// How many times `token` was acknowledged.
    pub fn ack_count(&self, token: &str) -> usize {
        self.acknowledged.get(token).map(|n| *n).unwrap_or(0)
    }

    /// Total acknowledgments across all tokens.
    pub fn total_acks(&self) -> usize {
        self.acknowledged.iter().map(|entry| *entry.value()).sum()
    }
}

#[async_trait]
impl ChannelDispatcher for MemoryChannels {
    async fn dispatch(&self, channel: ChannelIdentity, payload: &str) -> Result<(), DispatchError> {
        let attempt = {
            let mut attempts = self.attempts.entry(channel).or_insert(0);
            *attempts += 1;
            *attempts
        };

        if self.fail_on_attempt.get(&channel).map(|n| *n) == Some(attempt) {
            return Err(DispatchError::Transport {
                channel,
                reason: format!("injected failure on attempt {}", attempt),
            });
        }

        self.delivered
            .entry(channel)
            .or_default()
            .push(payload.to_string());

        Ok(())
    }
}

#[async_trait]
impl Acknowledger for MemoryChannels {
    async fn acknowledge(&self, token: AckToken) -> Result<(), AckError> {
        if self.fail_ack.load(Ordering::SeqCst) {
            return Err(AckError::Transport {
                token: token.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        *self.acknowledged.entry(token.to_string()).or_insert(0) += 1;
        Ok(())
    }
}

/// Fetcher serving canned documents.
///
/// Documents are looked up by URL, falling back to a default body when one
/// is configured. An optional delay simulates a slow server and is bounded
/// by the run deadline like a real fetch.
#[derive(Default)]
pub struct StaticFetcher {
    documents: HashMap<String, Vec<u8>>,
    fallback: Option<Vec<u8>>,
    delay: Option<Duration>,
    requests: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for any URL without a specific document.
    pub fn serving(body: impl Into<Vec<u8>>) -> Self {
        Self {
            fallback: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn with_document(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.documents.insert(url.into(), body.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches attempted.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, deadline: Instant) -> Result<Vec<u8>, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();

        if let Some(delay) = self.delay {
            if tokio::time::timeout_at(deadline, tokio::time::sleep(delay))
                .await
                .is_err()
            {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                    budget: deadline.saturating_duration_since(started),
                });
            }
        }

        self.documents
            .get(url)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| FetchError::Unavailable(url.to_string()))
    }
}
