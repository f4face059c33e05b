//! Application Layer
//!
//! Ports (abstract interfaces) the application depends on, and the services
//! that orchestrate domain logic behind them.

pub mod ports;
pub mod services;
