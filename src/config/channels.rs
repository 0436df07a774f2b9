use serde::Serialize;

use crate::error::ConfigurationError;
use crate::notification::ChannelIdentity;

use super::ChannelsConfig;

/// Resolved destinations for every logical channel.
///
/// Constructed once at startup; construction fails if any mapping is
/// missing, so holders can resolve channels infallibly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelMap {
    incoming: String,
    notifier: String,
    webmention: String,
}

impl ChannelMap {
    pub fn new(
        incoming: impl Into<String>,
        notifier: impl Into<String>,
        webmention: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        Self::from_settings(&ChannelsConfig {
            incoming: Some(incoming.into()),
            notifier: Some(notifier.into()),
            webmention: Some(webmention.into()),
        })
    }

    /// Validate the configured mappings, reporting every missing one at once.
    pub fn from_settings(config: &ChannelsConfig) -> Result<Self, ConfigurationError> {
        let resolved = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let incoming = resolved(&config.incoming);
        let notifier = resolved(&config.notifier);
        let webmention = resolved(&config.webmention);

        match (incoming, notifier, webmention) {
            (Some(incoming), Some(notifier), Some(webmention)) => Ok(Self {
                incoming,
                notifier,
                webmention,
            }),
            (incoming, notifier, webmention) => {
                let missing = [
                    (ChannelIdentity::Incoming, incoming.is_none()),
                    (ChannelIdentity::Notifier, notifier.is_none()),
                    (ChannelIdentity::Webmention, webmention.is_none()),
                ]
                .into_iter()
                .filter(|(_, missing)| *missing)
                .map(|(channel, _)| channel)
                .collect();
                Err(ConfigurationError::MissingChannels(missing))
            }
        }
    }

    /// Concrete destination (Redis stream key) for a logical channel.
    pub fn resolve(&self, channel: ChannelIdentity) -> &str {
        match channel {
            ChannelIdentity::Incoming => &self.incoming,
            ChannelIdentity::Notifier => &self.notifier,
            ChannelIdentity::Webmention => &self.webmention,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_every_channel() {
        let map = ChannelMap::new("q:incoming", "q:notifier", "q:webmention").unwrap();

        assert_eq!(map.resolve(ChannelIdentity::Incoming), "q:incoming");
        assert_eq!(map.resolve(ChannelIdentity::Notifier), "q:notifier");
        assert_eq!(map.resolve(ChannelIdentity::Webmention), "q:webmention");
    }

    #[test]
    fn test_reports_all_missing_channels() {
        let config = ChannelsConfig {
            incoming: Some("q:incoming".to_string()),
            notifier: None,
            webmention: Some("   ".to_string()),
        };

        match ChannelMap::from_settings(&config) {
            Err(ConfigurationError::MissingChannels(missing)) => {
                assert_eq!(
                    missing,
                    vec![ChannelIdentity::Notifier, ChannelIdentity::Webmention]
                );
            }
            other => panic!("expected missing channels, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_config_is_rejected() {
        let err = ChannelMap::from_settings(&ChannelsConfig::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing channel mapping for: incoming, notifier, webmention"
        );
    }
}
