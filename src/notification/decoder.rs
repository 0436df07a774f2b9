use serde::Deserialize;

use crate::error::DecodeError;

use super::{AckToken, InboundNotification};

/// Wire format of an inbound notification. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct RawNotification {
    url: String,
}

/// Parse a raw notification body. The body itself is kept verbatim so it
/// can be forwarded unmodified.
pub fn decode(body: &str, token: AckToken) -> Result<InboundNotification, DecodeError> {
    let raw: RawNotification = serde_json::from_str(body)?;

    Ok(InboundNotification {
        url: raw.url,
        body: body.to_string(),
        token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_keeps_body_verbatim() {
        let body = r#"{ "url": "anysource" }"#;
        let notification = decode(body, AckToken::new("1-0")).unwrap();

        assert_eq!(notification.url, "anysource");
        assert_eq!(notification.body, body);
        assert_eq!(notification.token.as_str(), "1-0");
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let body = r#"{"url":"https://anyurl","published":"2023-12-09T17:00:00Z","detected":"2023-12-10T15:00:00Z"}"#;
        let notification = decode(body, AckToken::new("1-0")).unwrap();
        assert_eq!(notification.url, "https://anyurl");
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        assert!(decode("not json", AckToken::new("1-0")).is_err());
        assert!(decode(r#"{"link":"https://x"}"#, AckToken::new("1-0")).is_err());
        assert!(decode(r#"{"url":42}"#, AckToken::new("1-0")).is_err());
        assert!(decode(r#"["https://x"]"#, AckToken::new("1-0")).is_err());
    }
}
