//! Application Services
//!
//! Use-case orchestration over the domain: account registration and login,
//! journal bookkeeping, and live position tracking against the market data
//! hub.

pub mod auth;
pub mod journal;
pub mod positions;

pub use auth::{AuthError, AuthService};
pub use journal::{JournalError, JournalService, JournalStats, NewTrade};
pub use positions::PositionMonitor;
