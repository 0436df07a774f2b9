use serde::Serialize;

use super::{InboundNotification, Mention};

/// One mention per accepted link, all sharing the notification URL as source.
pub fn build_mentions(source: &str, links: &[String]) -> Vec<Mention> {
    links
        .iter()
        .map(|target| Mention::new(source, target.as_str()))
        .collect()
}

/// Compact JSON payload for the webmention channel.
///
/// Serialization failure degrades to an empty payload; dispatching it is
/// still attempted.
pub fn mention_payload(mention: &Mention) -> String {
    to_json(mention)
}

/// The payload forwarded to the notifier channel: the original body, untouched.
pub fn forward_payload(notification: &InboundNotification) -> &str {
    &notification.body
}

fn to_json<T: Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize payload, sending empty body");
            String::new()
        }
    }
}
