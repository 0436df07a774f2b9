use async_trait::async_trait;

use crate::error::DispatchError;

use super::ChannelIdentity;

/// Delivers payloads to logical channels.
///
/// Implementations resolve the channel to a concrete destination and make
/// exactly one delivery attempt per call. Retrying is left to the event
/// source redelivering the inbound notification.
#[async_trait]
pub trait ChannelDispatcher: Send + Sync {
    async fn dispatch(&self, channel: ChannelIdentity, payload: &str) -> Result<(), DispatchError>;
}
