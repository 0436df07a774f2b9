// Shared components
pub mod config;
pub mod error;
pub mod metrics;
pub mod redis;

// Pipeline
pub mod notification;

// Application layer
pub mod api;
pub mod server;
pub mod triggers;

// Supporting modules
pub mod telemetry;
