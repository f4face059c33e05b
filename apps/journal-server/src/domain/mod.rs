//! Domain Layer
//!
//! Core business types and logic with no infrastructure dependencies:
//! market data values, the symbol interest registry, and the trading
//! journal model.

pub mod journal;
pub mod market;
pub mod subscription;
