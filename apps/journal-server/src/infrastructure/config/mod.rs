//! Configuration Module
//!
//! Configuration loading for the journal server.

mod settings;

pub use settings::{
    ApiToken, ConfigError, FeedSettings, JournalConfig, ServerSettings, StorageSettings,
};
