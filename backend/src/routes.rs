use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chart_frontend::{DisplayList, OptionsChainTable, OrderBookTable, TickerTape};
use market_core::{
    checked_len, Candle, MarketError, OrderSide, PositionKind, TimeFrame, TradeGateway, TxHash,
    CONTRACT_ADDRESS,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Largest chart the renderer will lay out, per side.
const MAX_CHART_PX: f64 = 8_192.0;
const DEFAULT_CHART_WIDTH: f64 = 800.0;
const DEFAULT_CHART_HEIGHT: f64 = 400.0;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/candles", get(candles))
        .route("/api/timeframes", get(timeframes))
        .route("/api/orderbook", get(order_book))
        .route("/api/options", get(options_chain))
        .route("/api/ticker", get(ticker))
        .route("/api/snapshot", get(snapshot))
        .route("/api/chart", get(chart))
        .route("/api/orders", post(create_order))
        .route("/api/positions", post(open_position))
        .route("/api/positions/:id/close", post(close_position))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let wallet_connected = state.gateway.lock().await.is_connected();
    Json(json!({
        "ok": true,
        "contract": CONTRACT_ADDRESS,
        "wallet_connected": wallet_connected,
    }))
}

#[derive(Debug, Default, Deserialize)]
struct CandleParams {
    count: Option<i64>,
    timeframe: Option<String>,
}

async fn candles(
    State(state): State<AppState>,
    Query(params): Query<CandleParams>,
) -> Result<Json<Vec<Candle>>, ApiError> {
    let mut market = state.market.lock().await;
    let count = match params.count {
        Some(raw) => checked_len("count", raw)?,
        None => market.config().candles.count,
    };
    let timeframe = match params.timeframe.as_deref() {
        Some(raw) => raw.parse::<TimeFrame>()?,
        None => market.config().candles.timeframe,
    };
    Ok(Json(market.generate_candles_in(timeframe, count)?))
}

/// Labels of the timeframe strip, in display order.
async fn timeframes() -> Json<Vec<String>> {
    Json(TimeFrame::strip().iter().map(TimeFrame::name).collect())
}

#[derive(Debug, Default, Deserialize)]
struct BookParams {
    depth: Option<i64>,
    mid: Option<f64>,
    #[serde(default)]
    decrypted: bool,
}

async fn order_book(
    State(state): State<AppState>,
    Query(params): Query<BookParams>,
) -> Result<Json<OrderBookTable>, ApiError> {
    let mut market = state.market.lock().await;
    let depth = match params.depth {
        Some(raw) => checked_len("depth", raw)?,
        None => market.config().book.depth,
    };
    let mid = params.mid.unwrap_or(market.config().book.mid);
    let book = market.generate_order_book(depth, mid)?;
    Ok(Json(OrderBookTable::new(&book, params.decrypted, market.rng_mut())))
}

#[derive(Debug, Default, Deserialize)]
struct ChainParams {
    spot: Option<f64>,
    steps: Option<i64>,
}

async fn options_chain(
    State(state): State<AppState>,
    Query(params): Query<ChainParams>,
) -> Result<Json<OptionsChainTable>, ApiError> {
    let mut market = state.market.lock().await;
    let steps = match params.steps {
        Some(raw) if raw < 0 => {
            let reason = format!("must not be negative (got {raw})");
            return Err(MarketError::invalid("steps", reason).into());
        }
        Some(raw) => raw as usize,
        None => market.config().chain.steps,
    };
    let spot = params.spot.unwrap_or(market.config().chain.spot);
    let chain = market.generate_options_chain(spot, steps)?;
    Ok(Json(OptionsChainTable::new(&chain)))
}

async fn ticker(State(state): State<AppState>) -> Json<TickerTape> {
    let store = state.store.read().await;
    Json(TickerTape::new(store.ticker()))
}

/// Raw contents of the market store as last published.
async fn snapshot(State(state): State<AppState>) -> Json<Value> {
    let store = state.store.read().await;
    Json(json!({
        "revision": store.revision(),
        "candles": store.candles(),
        "order_book": store.order_book(),
        "options": store.options(),
        "ticker": store.ticker(),
    }))
}

#[derive(Debug, Default, Deserialize)]
struct ChartParams {
    count: Option<i64>,
    width: Option<f64>,
    height: Option<f64>,
}

fn chart_dimension(
    name: &'static str,
    value: Option<f64>,
    default: f64,
) -> Result<f64, MarketError> {
    let v = value.unwrap_or(default);
    if !v.is_finite() || v < 1.0 || v > MAX_CHART_PX {
        return Err(MarketError::invalid(
            name,
            format!("must be between 1 and {MAX_CHART_PX} pixels (got {v})"),
        ));
    }
    Ok(v)
}

/// One rendered frame as a display list.
async fn chart(
    State(state): State<AppState>,
    Query(params): Query<ChartParams>,
) -> Result<Json<DisplayList>, ApiError> {
    let width = chart_dimension("width", params.width, DEFAULT_CHART_WIDTH)?;
    let height = chart_dimension("height", params.height, DEFAULT_CHART_HEIGHT)?;
    let candles = {
        let mut market = state.market.lock().await;
        let count = match params.count {
            Some(raw) => checked_len("count", raw)?,
            None => market.config().candles.count,
        };
        market.generate_candles(count)?
    };
    let mut list = DisplayList::new(width, height);
    state.renderer.paint(&mut list, &candles);
    Ok(Json(list))
}

#[derive(Debug, Serialize)]
struct TxResponse {
    ok: bool,
    tx_hash: TxHash,
}

impl From<TxHash> for TxResponse {
    fn from(tx_hash: TxHash) -> Self {
        Self { ok: true, tx_hash }
    }
}

#[derive(Debug, Deserialize)]
struct OrderRequest {
    symbol: String,
    quantity: f64,
    price: f64,
    side: OrderSide,
}

async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<OrderRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    let hash = state
        .gateway
        .lock()
        .await
        .create_order(&req.symbol, req.quantity, req.price, req.side)?;
    info!(symbol = %req.symbol, side = %req.side, %hash, "order submitted");
    Ok(Json(hash.into()))
}

#[derive(Debug, Deserialize)]
struct PositionRequest {
    symbol: String,
    quantity: f64,
    entry_price: f64,
    kind: PositionKind,
}

async fn open_position(
    State(state): State<AppState>,
    Json(req): Json<PositionRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    let hash = state
        .gateway
        .lock()
        .await
        .open_position(&req.symbol, req.quantity, req.entry_price, req.kind)?;
    info!(symbol = %req.symbol, kind = ?req.kind, %hash, "position opened");
    Ok(Json(hash.into()))
}

#[derive(Debug, Deserialize)]
struct CloseRequest {
    current_price: f64,
    profit: f64,
}

async fn close_position(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<CloseRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    let hash = state
        .gateway
        .lock()
        .await
        .close_position(id, req.current_price, req.profit)?;
    info!(position = id, %hash, "position closed");
    Ok(Json(hash.into()))
}
