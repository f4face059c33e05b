//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Configuration loading.
pub mod config;

/// Upstream price feed client (WebSocket).
pub mod feed;

/// HTTP server for the journal API, health checks, and metrics.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Key-value persistence adapters.
pub mod storage;

/// Tracing initialization.
pub mod telemetry;
