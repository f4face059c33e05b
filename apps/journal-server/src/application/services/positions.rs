//! Position Monitor
//!
//! The market data hub's consumer: one listener per watched open trade.
//! Every delivered tick lands in a shared last-price map, which the journal
//! reads to mark open positions.
//!
//! Watching is keyed by trade id, so two open trades on the same symbol hold
//! two independent listeners and detach independently.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::application::ports::MarketDataPort;
use crate::domain::journal::Trade;
use crate::domain::market::{Symbol, Tick, TickListener};

struct Watch {
    symbol: Symbol,
    listener: TickListener,
}

/// Live price tracking for open trades.
pub struct PositionMonitor {
    market: Arc<dyn MarketDataPort>,
    prices: Arc<Mutex<HashMap<Symbol, Tick>>>,
    watches: Mutex<HashMap<String, Watch>>,
}

impl PositionMonitor {
    /// Create a monitor over a market data source.
    pub fn new(market: Arc<dyn MarketDataPort>) -> Self {
        Self {
            market,
            prices: Arc::new(Mutex::new(HashMap::new())),
            watches: Mutex::new(HashMap::new()),
        }
    }

    /// Start tracking an open trade's symbol.
    ///
    /// Closed trades and trades already watched are ignored.
    pub fn watch(&self, trade: &Trade) {
        if !trade.is_open() {
            return;
        }

        let mut watches = self.watches.lock();
        if watches.contains_key(&trade.id) {
            return;
        }

        let prices = Arc::clone(&self.prices);
        let listener = TickListener::new(move |tick: &Tick| {
            prices.lock().insert(tick.symbol.clone(), tick.clone());
        });
        self.market.add_listener(&trade.symbol, &listener);
        watches.insert(
            trade.id.clone(),
            Watch {
                symbol: trade.symbol.clone(),
                listener,
            },
        );
        debug!(trade_id = %trade.id, symbol = %trade.symbol, "watching trade");
    }

    /// Stop tracking a trade. Unknown trade ids are a silent no-op.
    pub fn unwatch(&self, trade_id: &str) {
        let Some(watch) = self.watches.lock().remove(trade_id) else {
            return;
        };
        self.market.remove_listener(&watch.symbol, &watch.listener);
        debug!(trade_id = %trade_id, symbol = %watch.symbol, "unwatched trade");
    }

    /// Number of trades currently watched.
    #[must_use]
    pub fn watch_count(&self) -> usize {
        self.watches.lock().len()
    }

    /// Latest delivered price for a symbol, if any tick arrived yet.
    #[must_use]
    pub fn last_price(&self, symbol: &str) -> Option<Decimal> {
        self.prices.lock().get(symbol).map(|tick| tick.price)
    }

    /// Snapshot of the latest price per symbol.
    #[must_use]
    pub fn quotes(&self) -> HashMap<Symbol, Decimal> {
        self.prices
            .lock()
            .iter()
            .map(|(symbol, tick)| (symbol.clone(), tick.price))
            .collect()
    }

    /// Profit/loss an open trade would realize at the latest price.
    ///
    /// `None` when the trade is closed or no tick arrived for its symbol.
    #[must_use]
    pub fn unrealized(&self, trade: &Trade) -> Option<Decimal> {
        let price = self.last_price(&trade.symbol)?;
        trade.unrealized_pnl(price)
    }
}
