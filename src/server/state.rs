use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::config::{ChannelMap, Settings};
use crate::redis::RedisPool;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub channels: ChannelMap,
    pub pool: Arc<RedisPool>,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(settings: Settings, channels: ChannelMap, pool: Arc<RedisPool>) -> Self {
        Self {
            settings: Arc::new(settings),
            channels,
            pool,
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}
