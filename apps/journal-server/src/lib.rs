#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Journal Server - Trading Journal with Live Price Fan-Out
//!
//! A trading journal service: users record buy/sell trades over HTTP and
//! see profit/loss move with live prices. One shared WebSocket connection
//! to the upstream price feed is fanned out to every open position that
//! registered interest; the connection survives reconnects and consumers
//! attach and detach without disrupting each other.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core types and logic with no infrastructure dependencies
//!   - `market`: Tick values, listener handles, connection lifecycle
//!   - `subscription`: Symbol-to-listener interest registry
//!   - `journal`: Users, trades, profit/loss arithmetic
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Market data and key-value store interfaces
//!   - `services`: Auth, journal bookkeeping, live position tracking
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `feed`: WebSocket client for the price feed (the hub)
//!   - `storage`: In-memory and JSON-file key-value adapters
//!   - `http`: Journal API, health checks, metrics endpoint
//!   - `config`: Environment configuration
//!
//! # Data Flow
//!
//! ```text
//! Price Feed WS ──► MarketDataHub ──► TickListeners ──► PositionMonitor
//!                    (fan-out per            │           (last prices)
//!                     symbol)                │                │
//!                                            ▼                ▼
//! Browser ◄──────── HTTP API ◄──── JournalService ◄── unrealized P/L
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::journal::{Trade, TradeSide, TradeStatus, User};
pub use domain::market::{ConnectionState, Symbol, Tick, TickListener};
pub use domain::subscription::SubscriptionRegistry;

// Application surface
pub use application::ports::{KeyValueStore, MarketDataPort, StoreError};
pub use application::services::{
    AuthError, AuthService, JournalError, JournalService, JournalStats, NewTrade, PositionMonitor,
};

// Infrastructure config
pub use infrastructure::config::{ApiToken, ConfigError, JournalConfig};

// Feed client (for integration tests)
pub use infrastructure::feed::{FeedSnapshot, HubConfig, MarketDataHub};

// Storage adapters
pub use infrastructure::storage::{InMemoryKeyValueStore, JsonFileStore, KvJournalStore};

// HTTP server (router exposed for integration tests)
pub use infrastructure::http::{ApiServer, ApiServerError, AppState, router};

// Metrics
pub use infrastructure::metrics::init_metrics;
