//! HTTP Surface
//!
//! One axum server carries the journal API, health checks, and Prometheus
//! metrics. Used by browsers/clients for the journal and by orchestrators
//! and monitoring for the rest.
//!
//! # Endpoints
//!
//! - `POST /api/register` - Create an account
//! - `POST /api/login` - Look up an account by credentials
//! - `GET /api/trades?userId=` - Trades with live profit/loss and stats
//! - `POST /api/trades` - Record an open trade
//! - `POST /api/trades/{id}/close` - Exit a trade at a price
//! - `POST /api/trades/{id}/notes` - Replace a trade's notes
//! - `DELETE /api/trades/{id}?userId=` - Remove a trade
//! - `GET /health` - JSON health status
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (checks the feed)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::{
    AuthError, AuthService, JournalError, JournalService, JournalStats, NewTrade, PositionMonitor,
};
use crate::domain::journal::{Trade, TradeSide, TradeStatus, User};
use crate::infrastructure::feed::MarketDataHub;
use crate::infrastructure::metrics::{get_metrics_handle, set_open_positions};

// =============================================================================
// Application State
// =============================================================================

/// Shared state behind every handler.
pub struct AppState {
    /// Registration and login.
    pub auth: AuthService,
    /// Trade bookkeeping.
    pub journal: JournalService,
    /// Live price tracking for open trades.
    pub monitor: Arc<PositionMonitor>,
    /// The feed client, for health reporting.
    pub hub: Arc<MarketDataHub>,
    /// Server version string.
    pub version: String,
    /// When the server started.
    pub started_at: Instant,
}

impl AppState {
    /// Create the state for the HTTP server.
    #[must_use]
    pub fn new(
        auth: AuthService,
        journal: JournalService,
        monitor: Arc<PositionMonitor>,
        hub: Arc<MarketDataHub>,
    ) -> Self {
        Self {
            auth,
            journal,
            monitor,
            hub,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
        }
    }
}

/// Build the router with every endpoint attached.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/register", post(register_handler))
        .route("/api/login", post(login_handler))
        .route("/api/trades", get(list_trades_handler).post(open_trade_handler))
        .route("/api/trades/{id}/close", post(close_trade_handler))
        .route("/api/trades/{id}/notes", post(update_notes_handler))
        .route("/api/trades/{id}", delete(delete_trade_handler))
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// Server
// =============================================================================

/// The journal HTTP server.
pub struct ApiServer {
    port: u16,
    state: Arc<AppState>,
    cancel: CancellationToken,
}

impl ApiServer {
    /// Create a new server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<AppState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ApiServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), ApiServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ApiServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| ApiServerError::ServerFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// API Error
// =============================================================================

/// Error surfaced to API clients as `{"error": ...}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let status = match &error {
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, error.to_string())
    }
}

impl From<JournalError> for ApiError {
    fn from(error: JournalError) -> Self {
        let status = match &error {
            JournalError::TradeNotFound { .. } => StatusCode::NOT_FOUND,
            JournalError::AlreadyClosed { .. } => StatusCode::CONFLICT,
            JournalError::InvalidExitPrice { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            JournalError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, error.to_string())
    }
}

// =============================================================================
// Journal API Types
// =============================================================================

/// Registration and login request body.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    /// Login email.
    pub email: String,
    /// Login password.
    pub password: String,
}

/// Account returned to clients. The password never leaves the server.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User id.
    pub id: String,
    /// Login email.
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

/// Request body for recording a trade.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTradeRequest {
    /// Owner of the trade.
    pub user_id: String,
    /// The trade to record.
    #[serde(flatten)]
    pub trade: NewTrade,
}

/// Request body for closing a trade.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTradeRequest {
    /// Owner of the trade.
    pub user_id: String,
    /// Price the position exited at.
    pub exit_price: Decimal,
}

/// Request body for replacing a trade's notes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesRequest {
    /// Owner of the trade.
    pub user_id: String,
    /// Replacement notes.
    pub notes: String,
}

/// Query identifying the journal owner.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    /// Owner of the journal.
    pub user_id: String,
}

/// A trade joined with its live or realized profit/loss.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeView {
    /// Trade id.
    pub id: String,
    /// Symbol traded.
    pub symbol: String,
    /// Trade direction.
    pub side: TradeSide,
    /// Entry price.
    pub entry_price: Decimal,
    /// Exit price; `null` while open.
    pub exit_price: Option<Decimal>,
    /// Position size.
    pub quantity: Decimal,
    /// When the trade was recorded.
    pub opened_at: DateTime<Utc>,
    /// Open or closed.
    pub status: TradeStatus,
    /// Free-form notes.
    pub notes: String,
    /// Latest delivered price; `null` until a tick arrives or once closed.
    pub current_price: Option<Decimal>,
    /// Live profit/loss at the current price; `null` until a tick arrives
    /// or once closed.
    pub unrealized_pnl: Option<Decimal>,
    /// Profit/loss locked in at exit; `null` while open.
    pub realized_pnl: Option<Decimal>,
}

impl TradeView {
    fn from_trade(trade: Trade, monitor: &PositionMonitor) -> Self {
        let current_price = trade
            .is_open()
            .then(|| monitor.last_price(&trade.symbol))
            .flatten();
        let unrealized_pnl = monitor.unrealized(&trade);
        let realized_pnl = trade.realized_pnl();

        Self {
            id: trade.id,
            symbol: trade.symbol,
            side: trade.side,
            entry_price: trade.entry_price,
            exit_price: trade.exit_price,
            quantity: trade.quantity,
            opened_at: trade.opened_at,
            status: trade.status,
            notes: trade.notes,
            current_price,
            unrealized_pnl,
            realized_pnl,
        }
    }
}

/// Response for the trade list: every trade plus aggregate statistics.
#[derive(Debug, Serialize)]
pub struct TradeListResponse {
    /// Trades, oldest first.
    pub trades: Vec<TradeView>,
    /// Aggregate statistics at the latest quotes.
    pub stats: JournalStats,
}

// =============================================================================
// Journal API Handlers
// =============================================================================

async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.auth.register(&request.email, &request.password).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(UserResponse::from(user)))
}

async fn list_trades_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<TradeListResponse>, ApiError> {
    let trades = state.journal.trades(&query.user_id).await?;
    let stats = state
        .journal
        .stats(&query.user_id, &state.monitor.quotes())
        .await?;

    let views = trades
        .into_iter()
        .map(|trade| TradeView::from_trade(trade, &state.monitor))
        .collect();
    Ok(Json(TradeListResponse {
        trades: views,
        stats,
    }))
}

async fn open_trade_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OpenTradeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let trade = state
        .journal
        .open_trade(&request.user_id, request.trade)
        .await?;

    state.monitor.watch(&trade);
    set_open_positions(state.monitor.watch_count());

    let view = TradeView::from_trade(trade, &state.monitor);
    Ok((StatusCode::CREATED, Json(view)))
}

async fn close_trade_handler(
    State(state): State<Arc<AppState>>,
    Path(trade_id): Path<String>,
    Json(request): Json<CloseTradeRequest>,
) -> Result<Json<TradeView>, ApiError> {
    let trade = state
        .journal
        .close_trade(&request.user_id, &trade_id, request.exit_price)
        .await?;

    state.monitor.unwatch(&trade_id);
    set_open_positions(state.monitor.watch_count());

    Ok(Json(TradeView::from_trade(trade, &state.monitor)))
}

async fn update_notes_handler(
    State(state): State<Arc<AppState>>,
    Path(trade_id): Path<String>,
    Json(request): Json<NotesRequest>,
) -> Result<Json<TradeView>, ApiError> {
    let trade = state
        .journal
        .update_notes(&request.user_id, &trade_id, request.notes)
        .await?;
    Ok(Json(TradeView::from_trade(trade, &state.monitor)))
}

async fn delete_trade_handler(
    State(state): State<Arc<AppState>>,
    Path(trade_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<StatusCode, ApiError> {
    state.journal.delete_trade(&query.user_id, &trade_id).await?;

    state.monitor.unwatch(&trade_id);
    set_open_positions(state.monitor.watch_count());

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Health Handlers
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "degraded".
    pub status: HealthStatus,
    /// Server version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Feed connection status.
    pub feed: FeedInfo,
    /// Open trades watched for live prices.
    pub watched_positions: usize,
}

/// Overall health status.
///
/// The server never reports unhealthy for feed loss alone: the journal
/// keeps working and the hub reconnects on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Feed connected, everything operational.
    Healthy,
    /// Feed down; the journal works, live prices are stale.
    Degraded,
}

/// Feed connection status.
#[derive(Debug, Clone, Serialize)]
pub struct FeedInfo {
    /// Connection state.
    pub state: String,
    /// Whether the feed is connected.
    pub connected: bool,
    /// When the current or most recent connection opened.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Symbols with upstream interest.
    pub subscribed_symbols: usize,
    /// Messages received from the feed.
    pub messages_received: u64,
    /// Reconnect attempts scheduled so far.
    pub reconnects: u64,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let snapshot = state.hub.snapshot();
    let connected = snapshot.connection.is_open();

    HealthResponse {
        status: if connected {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        feed: FeedInfo {
            state: snapshot.connection.as_str().to_string(),
            connected,
            last_connected_at: snapshot.last_connected_at,
            subscribed_symbols: snapshot.subscribed_symbols,
            messages_received: snapshot.messages_received,
            reconnects: snapshot.reconnects,
        },
        watched_positions: state.monitor.watch_count(),
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(build_health_response(&state)))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.hub.snapshot().connection.is_open() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

// =============================================================================
// Tests
// =============================================================================
