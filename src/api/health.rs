//! Health check endpoint.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ChannelMap;
use crate::server::AppState;

/// Upper bound on the Redis round trip made by a health check.
const PING_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub redis: RedisHealthResponse,
    pub consumer: ConsumerHealthResponse,
    pub channels: ChannelMap,
}

#[derive(Debug, Serialize)]
pub struct RedisHealthResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConsumerHealthResponse {
    pub group: String,
    pub name: String,
}

/// GET /health - 200 when Redis answers, 503 otherwise
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let ping = match tokio::time::timeout(PING_TIMEOUT, state.pool.ping()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("ping timed out after {:?}", PING_TIMEOUT)),
    };

    let (code, status) = match ping {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "degraded"),
    };

    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: state.started_at,
        uptime_seconds: state.start_time.elapsed().as_secs(),
        redis: RedisHealthResponse {
            connected: ping.is_ok(),
            error: ping.err(),
        },
        consumer: ConsumerHealthResponse {
            group: state.settings.consumer.group.clone(),
            name: state.settings.consumer.name.clone(),
        },
        channels: state.channels.clone(),
    };

    (code, Json(body))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{RedisConfig, Settings};
    use crate::redis::RedisPool;

    #[tokio::test]
    async fn test_health_degraded_without_redis() {
        let settings = Settings::default();
        let pool = Arc::new(
            RedisPool::new(RedisConfig {
                url: "redis://127.0.0.1:1".to_string(),
                ..RedisConfig::default()
            })
            .unwrap(),
        );
        let channels =
            ChannelMap::new("posts:incoming", "posts:notifier", "posts:webmention").unwrap();
        let state = AppState::new(settings, channels, pool);

        let (code, Json(body)) = health(State(state)).await;

        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
        assert!(!body.redis.connected);
        assert!(body.redis.error.is_some());
        assert_eq!(body.channels.resolve(crate::notification::ChannelIdentity::Webmention), "posts:webmention");
        assert_eq!(body.consumer.group, "mention-dispatcher");
    }
}
