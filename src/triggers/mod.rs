mod redis;

pub use redis::IncomingConsumer;
