//! Symbol Interest Registry
//!
//! Domain state tracking which listener handles want ticks for which
//! symbols. Interest is kept at symbol level: the upstream feed is asked for
//! a symbol once, however many listeners are attached to it.
//!
//! # Design
//!
//! The registry maps each symbol to the set of handles attached to it. Over
//! listener operations the map holds an entry for a symbol if and only if at
//! least one handle is attached — an entry whose last handle departs is
//! removed in the same call. `ensure` can create an entry with no handles
//! yet; such an entry still counts as upstream interest (it is re-subscribed
//! after a reconnect) and collapses on the next detach for its symbol.
//!
//! The registry is a plain data structure with no interior locking; the hub
//! owns one behind its state mutex.

use std::collections::HashMap;

use crate::domain::market::{Symbol, TickListener};

// =============================================================================
// Detach Outcome
// =============================================================================

/// Outcome of detaching a listener handle from a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detach {
    /// Nothing changed: no entry for the symbol, or the handle was not
    /// attached and others remain.
    NotFound,
    /// The handle was removed; this many listeners remain attached.
    Remaining(usize),
    /// The symbol entry was dropped because no listeners remain on it.
    Empty,
}

// =============================================================================
// Subscription Registry
// =============================================================================

/// Registry mapping each symbol to the listener handles attached to it.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: HashMap<Symbol, Vec<TickListener>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure an entry exists for `symbol`.
    ///
    /// Returns `true` if the entry was created by this call.
    pub fn ensure(&mut self, symbol: &str) -> bool {
        if self.entries.contains_key(symbol) {
            return false;
        }
        self.entries.insert(symbol.to_string(), Vec::new());
        true
    }

    /// Attach a listener handle to `symbol`, creating the entry if needed.
    ///
    /// Attaching a handle that is already present is a no-op (set
    /// semantics, by handle identity). Returns `true` if the symbol entry
    /// was created by this call.
    pub fn attach(&mut self, symbol: &str, listener: &TickListener) -> bool {
        let created = self.ensure(symbol);
        if let Some(listeners) = self.entries.get_mut(symbol)
            && !listeners.contains(listener)
        {
            listeners.push(listener.clone());
        }
        created
    }

    /// Detach exactly the matching handle from `symbol`.
    ///
    /// Detaching a handle that was never attached is a no-op. When the last
    /// handle departs (or the entry was already empty), the entry itself is
    /// removed and [`Detach::Empty`] is returned.
    pub fn detach(&mut self, symbol: &str, listener: &TickListener) -> Detach {
        let Some(listeners) = self.entries.get_mut(symbol) else {
            return Detach::NotFound;
        };

        if let Some(index) = listeners.iter().position(|l| l == listener) {
            listeners.remove(index);
        } else if !listeners.is_empty() {
            return Detach::NotFound;
        }

        let remaining = listeners.len();
        if remaining == 0 {
            self.entries.remove(symbol);
            return Detach::Empty;
        }
        Detach::Remaining(remaining)
    }

    /// Remove a symbol entry entirely, discarding any attached listeners.
    ///
    /// Returns `true` if an entry existed.
    pub fn remove(&mut self, symbol: &str) -> bool {
        self.entries.remove(symbol).is_some()
    }

    /// Check whether an entry exists for `symbol`.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    /// Number of listeners attached to `symbol` (0 if no entry).
    #[must_use]
    pub fn listener_count(&self, symbol: &str) -> usize {
        self.entries.get(symbol).map_or(0, Vec::len)
    }

    /// All symbols with a registry entry.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        self.entries.keys().cloned().collect()
    }

    /// Number of symbols with a registry entry.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the registry has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the handles currently attached to `symbol`.
    ///
    /// Returns `None` when no entry exists, so the caller can tell "no
    /// interest" apart from an interest entry with no handles yet.
    #[must_use]
    pub fn listeners(&self, symbol: &str) -> Option<Vec<TickListener>> {
        self.entries.get(symbol).cloned()
    }
}
