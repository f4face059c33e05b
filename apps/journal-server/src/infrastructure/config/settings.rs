//! Journal Server Configuration Settings
//!
//! Configuration types for the journal server, loaded from environment
//! variables.

use std::path::PathBuf;
use std::time::Duration;

/// Static API token for the price feed.
///
/// The feed authenticates via a token query parameter on the connection
/// URL; the token never appears in logs or `Debug` output.
#[derive(Clone)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap a token string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyValue`] if the token is empty.
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ConfigError::EmptyValue("FEED_API_TOKEN".to_string()));
        }
        Ok(Self(token))
    }

    /// Get the raw token for URL construction.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ApiToken").field(&"[REDACTED]").finish()
    }
}

/// Price feed connection settings.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// WebSocket URL of the feed, without the token query parameter.
    pub stream_url: String,
    /// API token appended to the connection URL.
    pub api_token: ApiToken,
    /// Fixed delay between a transport failure and the next connection
    /// attempt.
    pub reconnect_delay: Duration,
}

impl FeedSettings {
    /// Default feed endpoint.
    pub const DEFAULT_STREAM_URL: &'static str = "wss://ws.finnhub.io";

    /// Default reconnect delay.
    pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5_000);
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Port for the journal API, health checks, and metrics.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 8080 }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Default)]
pub struct StorageSettings {
    /// Directory for the JSON file store. `None` keeps the journal in
    /// memory for the life of the process.
    pub data_dir: Option<PathBuf>,
}

/// Complete journal server configuration.
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Price feed connection settings.
    pub feed: FeedSettings,
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Persistence settings.
    pub storage: StorageSettings,
}

impl JournalConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `FEED_API_TOKEN` is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var("FEED_API_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("FEED_API_TOKEN".to_string()))?;
        let api_token = ApiToken::new(token)?;

        let stream_url = std::env::var("FEED_WS_URL")
            .unwrap_or_else(|_| FeedSettings::DEFAULT_STREAM_URL.to_string());

        let feed = FeedSettings {
            stream_url,
            api_token,
            reconnect_delay: parse_env_duration_millis(
                "FEED_RECONNECT_DELAY_MS",
                FeedSettings::DEFAULT_RECONNECT_DELAY,
            ),
        };

        let server = ServerSettings {
            http_port: parse_env_u16("JOURNAL_HTTP_PORT", ServerSettings::default().http_port),
        };

        let storage = StorageSettings {
            data_dir: std::env::var("JOURNAL_DATA_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        };

        Ok(Self {
            feed,
            server,
            storage,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
