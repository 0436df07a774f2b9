//! Acknowledgment of inbound notifications.

use async_trait::async_trait;

use crate::error::AckError;

use super::AckToken;

/// Marks an inbound notification as consumed at its source.
///
/// Takes the token by value: once handed over it cannot be acknowledged
/// again within the same run.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn acknowledge(&self, token: AckToken) -> Result<(), AckError>;
}
