//! Error taxonomy for the dispatcher.
//!
//! `ConfigurationError` is fatal at startup. Every other error is scoped to
//! a single pipeline run: it aborts the remaining steps and leaves the
//! inbound notification unacknowledged so the source redelivers it.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::notification::ChannelIdentity;

/// Startup-time configuration failure.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Missing channel mapping for: {}", join_channels(.0))]
    MissingChannels(Vec<ChannelIdentity>),
}

fn join_channels(channels: &[ChannelIdentity]) -> String {
    channels
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed notification body: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Fetching {url} exceeded the {}ms budget", .budget.as_millis())]
    Timeout { url: String, budget: Duration },

    #[error("Fetching {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Document unavailable: {0}")]
    Unavailable(String),
}

/// Link extraction failure.
///
/// Uninhabited: the HTML5 parser recovers from any markup and undecodable
/// bytes are replaced, so extraction has no failure mode.
#[derive(Debug)]
pub enum ExtractionError {}

impl fmt::Display for ExtractionError {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl std::error::Error for ExtractionError {}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Delivery to {channel} failed: {reason}")]
    Transport {
        channel: ChannelIdentity,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum AckError {
    #[error("Acknowledging {token} failed: {reason}")]
    Transport { token: String, reason: String },
}

/// Failure of a single pipeline run.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Ack(#[from] AckError),
}

impl ProcessError {
    /// Stable label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessError::Decode(_) => "decode",
            ProcessError::Fetch(_) => "fetch",
            ProcessError::Extraction(_) => "extract",
            ProcessError::Dispatch(_) => "dispatch",
            ProcessError::Ack(_) => "ack",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_channels_lists_every_channel() {
        let err = ConfigurationError::MissingChannels(vec![
            ChannelIdentity::Incoming,
            ChannelIdentity::Webmention,
        ]);
        assert_eq!(
            err.to_string(),
            "Missing channel mapping for: incoming, webmention"
        );
    }

    #[test]
    fn test_process_error_kind() {
        let decode: ProcessError = serde_json::from_str::<u8>("nope")
            .map_err(DecodeError::from)
            .unwrap_err()
            .into();
        assert_eq!(decode.kind(), "decode");

        let dispatch: ProcessError = DispatchError::Transport {
            channel: ChannelIdentity::Notifier,
            reason: "boom".to_string(),
        }
        .into();
        assert_eq!(dispatch.kind(), "dispatch");
        assert_eq!(dispatch.to_string(), "Delivery to notifier failed: boom");

        let ack: ProcessError = AckError::Transport {
            token: "1-0".to_string(),
            reason: "gone".to_string(),
        }
        .into();
        assert_eq!(ack.kind(), "ack");
    }

    #[test]
    fn test_timeout_message_includes_budget() {
        let err = FetchError::Timeout {
            url: "https://example.com".to_string(),
            budget: Duration::from_secs(3),
        };
        assert_eq!(
            err.to_string(),
            "Fetching https://example.com exceeded the 3000ms budget"
        );
    }
}
