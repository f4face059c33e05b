//! Trading Journal Domain Types
//!
//! The journal model: users, recorded trades, and profit/loss arithmetic.
//! Prices and quantities use [`Decimal`] for exact financial arithmetic.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod repository;

pub use repository::{JournalRepository, StorageError};

// =============================================================================
// Trade
// =============================================================================

/// Direction of a recorded trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    /// Long position: profits when price rises above entry.
    Buy,
    /// Short position: profits when price falls below entry.
    Sell,
}

impl TradeSide {
    /// Get the side name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// Lifecycle of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    /// Position is held; profit/loss moves with the live price.
    Open,
    /// Position was exited at a recorded price.
    Closed,
}

/// A journal entry for one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade id (UUID v4).
    pub id: String,
    /// Symbol traded. Stored uppercased, as entered in the journal.
    pub symbol: String,
    /// Trade direction.
    pub side: TradeSide,
    /// Price at which the position was entered.
    pub entry_price: Decimal,
    /// Price at which the position was exited; `None` while open.
    pub exit_price: Option<Decimal>,
    /// Number of units held. Fractional quantities are allowed.
    pub quantity: Decimal,
    /// When the trade was recorded.
    pub opened_at: DateTime<Utc>,
    /// Open or closed.
    pub status: TradeStatus,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
}

impl Trade {
    /// Record a new open trade. Assigns a fresh id and the current time,
    /// and uppercases the symbol.
    #[must_use]
    pub fn open(
        symbol: &str,
        side: TradeSide,
        entry_price: Decimal,
        quantity: Decimal,
        notes: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            symbol: symbol.to_uppercase(),
            side,
            entry_price,
            exit_price: None,
            quantity,
            opened_at: Utc::now(),
            status: TradeStatus::Open,
            notes,
        }
    }

    /// Check whether the position is still held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Close the position at `exit_price`.
    pub fn close(&mut self, exit_price: Decimal) {
        self.exit_price = Some(exit_price);
        self.status = TradeStatus::Closed;
    }

    /// Profit or loss locked in at the exit price.
    ///
    /// `None` while the position is open.
    #[must_use]
    pub fn realized_pnl(&self) -> Option<Decimal> {
        self.exit_price.map(|exit| self.directional_pnl(exit))
    }

    /// Profit or loss the position would realize at `current_price`.
    ///
    /// `None` once the position is closed; the realized figure applies then.
    #[must_use]
    pub fn unrealized_pnl(&self, current_price: Decimal) -> Option<Decimal> {
        self.is_open().then(|| self.directional_pnl(current_price))
    }

    /// Check whether the closed position came out ahead.
    ///
    /// `None` while open.
    #[must_use]
    pub fn is_winner(&self) -> Option<bool> {
        let exit = self.exit_price?;
        let diff = exit - self.entry_price;
        Some(match self.side {
            TradeSide::Buy => diff > Decimal::ZERO,
            TradeSide::Sell => diff < Decimal::ZERO,
        })
    }

    fn directional_pnl(&self, price: Decimal) -> Decimal {
        let diff = (price - self.entry_price) * self.quantity;
        match self.side {
            TradeSide::Buy => diff,
            TradeSide::Sell => -diff,
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// A registered journal user.
///
/// Credentials are stored and compared as-is; this journal keeps no
/// sessions and applies no hashing.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user id (UUID v4).
    pub id: String,
    /// Login email, the unique handle for a user.
    pub email: String,
    /// Login password.
    pub password: String,
}

impl User {
    /// Register a new user with a fresh id.
    #[must_use]
    pub fn new(email: String, password: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            password,
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
