//! Per-notification pipeline.
//!
//! Flow, strictly linear, any failure aborts the run:
//! 1. Decode the raw body
//! 2. Forward the body verbatim to the notifier channel
//! 3. Fetch the published document
//! 4. Extract qualifying outbound links
//! 5. Dispatch one mention per link to the webmention channel, in order
//! 6. Acknowledge the inbound notification
//!
//! A failed run never acknowledges, so the source redelivers the
//! notification. The forward in step 2 is not idempotent: a redelivered
//! notification is forwarded again.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::error::{DispatchError, ProcessError};
use crate::metrics::PipelineMetrics;

use super::builder::{build_mentions, forward_payload, mention_payload};
use super::decoder::decode;
use super::extractor::extract_links;
use super::{AckToken, Acknowledger, ChannelDispatcher, ChannelIdentity, DocumentFetcher};

/// Default budget for fetching the published document.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// URL of the processed notification
    pub source: String,
    /// Number of mentions dispatched
    pub mentions: usize,
}

/// Runs the pipeline for one inbound notification at a time.
///
/// Holds no per-run state, so one processor can serve concurrent runs.
pub struct Processor {
    fetcher: Arc<dyn DocumentFetcher>,
    dispatcher: Arc<dyn ChannelDispatcher>,
    acknowledger: Arc<dyn Acknowledger>,
    fetch_timeout: Duration,
}

impl Processor {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        dispatcher: Arc<dyn ChannelDispatcher>,
        acknowledger: Arc<dyn Acknowledger>,
    ) -> Self {
        Self {
            fetcher,
            dispatcher,
            acknowledger,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Override the fetch budget (measured from the start of each run).
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Process one inbound notification.
    #[tracing::instrument(
        name = "processor.process",
        skip(self, body, token),
        fields(entry_id = %token)
    )]
    pub async fn process(&self, body: &str, token: AckToken) -> Result<RunReport, ProcessError> {
        let started = Instant::now();
        let result = self.run(body, token, started).await;

        match &result {
            Ok(report) => {
                PipelineMetrics::record_run("acknowledged", started.elapsed());
                tracing::info!(
                    source = %report.source,
                    mentions = report.mentions,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Notification processed"
                );
            }
            Err(e) => {
                PipelineMetrics::record_run(e.kind(), started.elapsed());
                tracing::warn!(
                    kind = e.kind(),
                    error = %e,
                    "Notification left unacknowledged"
                );
            }
        }

        result
    }

    async fn run(
        &self,
        body: &str,
        token: AckToken,
        started: Instant,
    ) -> Result<RunReport, ProcessError> {
        let notification = decode(body, token)?;
        tracing::info!(url = %notification.url, "Received notification");

        self.send(ChannelIdentity::Notifier, forward_payload(&notification))
            .await?;

        let fetch_started = Instant::now();
        let fetched = self
            .fetcher
            .fetch(&notification.url, started + self.fetch_timeout)
            .await;
        PipelineMetrics::record_fetch(fetch_started.elapsed());
        let document = fetched?;

        let links = extract_links(&document)?;
        PipelineMetrics::record_links(links.len());

        let mentions = build_mentions(&notification.url, &links);
        for mention in &mentions {
            tracing::debug!(target_url = %mention.target, "Found outgoing link");
            self.send(ChannelIdentity::Webmention, &mention_payload(mention))
                .await?;
        }

        let source = notification.url;
        self.acknowledger.acknowledge(notification.token).await?;

        Ok(RunReport {
            source,
            mentions: mentions.len(),
        })
    }

    async fn send(&self, channel: ChannelIdentity, payload: &str) -> Result<(), DispatchError> {
        let result = self.dispatcher.dispatch(channel, payload).await;
        PipelineMetrics::record_dispatch(channel, result.is_ok());
        result
    }
}
