mod channels;
mod settings;

pub use channels::ChannelMap;
pub use settings::{
    ChannelsConfig, ConsumerConfig, FetchConfig, OtelConfig, RedisConfig, ServerConfig, Settings,
};
