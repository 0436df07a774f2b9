//! Redis plumbing: the shared command pool and reconnect backoff.

mod backoff;
pub mod pool;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use pool::{PoolError, RedisPool, RedisPoolExt};
