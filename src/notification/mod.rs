//! The notification pipeline: decode, fetch, extract, dispatch, acknowledge.
//!
//! # Ports
//!
//! The [`Processor`] depends only on three capabilities, each with a Redis
//! production adapter and an in-memory double:
//!
//! - [`DocumentFetcher`]: `HttpFetcher` / `StaticFetcher`
//! - [`ChannelDispatcher`]: `RedisStreamDispatcher` / `MemoryChannels`
//! - [`Acknowledger`]: `RedisStreamAcknowledger` / `MemoryChannels`

pub mod ack_backend;
pub mod builder;
pub mod decoder;
mod dispatcher;
pub mod extractor;
pub mod fetcher;
pub mod memory_backend;
mod processor;
pub mod redis_backend;
mod types;
pub mod validator;

pub use ack_backend::Acknowledger;
pub use dispatcher::ChannelDispatcher;
pub use fetcher::{DocumentFetcher, HttpFetcher};
pub use memory_backend::{MemoryChannels, StaticFetcher};
pub use processor::{Processor, RunReport, DEFAULT_FETCH_TIMEOUT};
pub use redis_backend::{RedisStreamAcknowledger, RedisStreamDispatcher, BODY_FIELD};
pub use types::{AckToken, ChannelIdentity, InboundNotification, Mention};
