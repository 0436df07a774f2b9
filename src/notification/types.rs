use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque acknowledgment token handed out by the event source.
///
/// For the Redis transport this is the stream entry ID. The token is
/// consumed by value when acknowledging, so a run can use it at most once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AckToken(String);

impl AckToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AckToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A decoded "new post published" notification.
///
/// Lives only for the duration of one pipeline run.
#[derive(Debug)]
pub struct InboundNotification {
    /// URL of the newly published document
    pub url: String,
    /// The raw body exactly as received, forwarded verbatim
    pub body: String,
    /// Token used to remove the notification from its source
    pub token: AckToken,
}

/// A derived payload stating that `source` links to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub source: String,
    pub target: String,
}

impl Mention {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Logical delivery channels. Concrete destinations are resolved through
/// [`ChannelMap`](crate::config::ChannelMap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelIdentity {
    /// Source of inbound notifications; acknowledgments go here
    Incoming,
    /// General-purpose notification channel, receives the verbatim forward
    Notifier,
    /// Receives one [`Mention`] per qualifying outbound link
    Webmention,
}

impl ChannelIdentity {
    pub const ALL: [ChannelIdentity; 3] = [
        ChannelIdentity::Incoming,
        ChannelIdentity::Notifier,
        ChannelIdentity::Webmention,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelIdentity::Incoming => "incoming",
            ChannelIdentity::Notifier => "notifier",
            ChannelIdentity::Webmention => "webmention",
        }
    }
}

impl fmt::Display for ChannelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_serializes_compact() {
        let mention = Mention::new("anysource", "https://anytarget");
        let json = serde_json::to_string(&mention).unwrap();
        assert_eq!(json, r#"{"source":"anysource","target":"https://anytarget"}"#);
    }

    #[test]
    fn test_channel_identity_names() {
        let names: Vec<&str> = ChannelIdentity::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["incoming", "notifier", "webmention"]);
        assert_eq!(ChannelIdentity::Webmention.to_string(), "webmention");
    }

    #[test]
    fn test_ack_token_is_opaque_string() {
        let token = AckToken::new("1700000000000-0");
        assert_eq!(token.as_str(), "1700000000000-0");
        assert_eq!(format!("{}", token), "1700000000000-0");
    }
}
