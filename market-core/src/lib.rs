use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod contract;
pub mod mask;

pub use contract::{
    ContractError, PositionKind, StubGateway, TradeGateway, TxHash, CONTRACT_ADDRESS,
};
pub use mask::{
    format_value, format_value_scrambled, format_value_with, MaskPolicy, MASK_GLYPH, MASK_WIDTH,
};

/// Milliseconds since Unix epoch.
pub type Timestamp = i64;

/// Number of milliseconds in common units.
pub const MS: i64 = 1_000;
pub const MINUTE_MS: i64 = 60 * MS;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Upper bound for any generated collection.
pub const MAX_SERIES_LEN: usize = 10_000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl MarketError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        MarketError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Validate a collection length coming from an untyped boundary (query strings, JS).
pub fn checked_len(name: &'static str, raw: i64) -> Result<usize, MarketError> {
    if raw < 0 {
        return Err(MarketError::invalid(name, format!("must not be negative (got {raw})")));
    }
    let len = raw as usize;
    ensure_len(name, len)?;
    Ok(len)
}

/// Reject empty or oversized lengths instead of clamping them.
pub fn ensure_len(name: &'static str, len: usize) -> Result<(), MarketError> {
    if len == 0 {
        return Err(MarketError::invalid(name, "must be at least 1"));
    }
    if len > MAX_SERIES_LEN {
        return Err(MarketError::invalid(
            name,
            format!("must be at most {MAX_SERIES_LEN} (got {len})"),
        ));
    }
    Ok(())
}

/// Reject NaN, infinities and non-positive reference prices.
pub fn ensure_price(name: &'static str, price: f64) -> Result<(), MarketError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(MarketError::invalid(
            name,
            format!("must be a finite positive price (got {price})"),
        ));
    }
    Ok(())
}

/// Candle bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrame {
    Minutes(u32),
    Hours(u32),
    Days(u32),
}

impl TimeFrame {
    pub fn duration_ms(&self) -> i64 {
        match *self {
            TimeFrame::Minutes(m) => m as i64 * MINUTE_MS,
            TimeFrame::Hours(h) => h as i64 * HOUR_MS,
            TimeFrame::Days(d) => d as i64 * DAY_MS,
        }
    }

    /// Label used on the chart's timeframe strip ("1m", "4H", "1D").
    pub fn name(&self) -> String {
        match *self {
            TimeFrame::Minutes(m) => format!("{m}m"),
            TimeFrame::Hours(h) => format!("{h}H"),
            TimeFrame::Days(d) => format!("{d}D"),
        }
    }

    /// The strip of timeframes offered above the chart.
    pub fn strip() -> [TimeFrame; 6] {
        [
            TimeFrame::Minutes(1),
            TimeFrame::Minutes(5),
            TimeFrame::Minutes(15),
            TimeFrame::Hours(1),
            TimeFrame::Hours(4),
            TimeFrame::Days(1),
        ]
    }
}

impl Default for TimeFrame {
    fn default() -> Self {
        TimeFrame::Hours(1)
    }
}

/// Parses the strip labels: "1m", "5m", "15m", "1h"/"1H", "4h"/"4H", "1d"/"1D".
impl FromStr for TimeFrame {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(TimeFrame::Minutes(1)),
            "5m" => Ok(TimeFrame::Minutes(5)),
            "15m" => Ok(TimeFrame::Minutes(15)),
            "1h" | "1H" => Ok(TimeFrame::Hours(1)),
            "4h" | "4H" => Ok(TimeFrame::Hours(4)),
            "1d" | "1D" => Ok(TimeFrame::Days(1)),
            _ => Err(MarketError::invalid("timeframe", format!("unknown timeframe {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub ts: Timestamp,        // bucket start time
    pub timeframe: TimeFrame, // timeframe of this candle
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Profit-side candle: strictly closed above its open.
    pub fn is_up(&self) -> bool {
        self.close > self.open
    }

    pub fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    pub fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }

    /// OHLCV consistency: high/low envelope the body and volume is non-negative.
    pub fn is_consistent(&self) -> bool {
        self.high >= self.body_top() && self.low <= self.body_bottom() && self.volume >= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Sign applied to ladder offsets: bids step down from the mid, asks step up.
    pub fn direction(&self) -> f64 {
        match self {
            OrderSide::Buy => -1.0,
            OrderSide::Sell => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One level of a synthetic ladder. `total` is derived from price and amount on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawOrderRow")]
pub struct OrderRow {
    price: f64,
    amount: f64,
    total: f64,
    encrypted: bool,
}

#[derive(Deserialize)]
struct RawOrderRow {
    price: f64,
    amount: f64,
    encrypted: bool,
}

impl From<RawOrderRow> for OrderRow {
    fn from(raw: RawOrderRow) -> Self {
        OrderRow::new(raw.price, raw.amount, raw.encrypted)
    }
}

impl OrderRow {
    pub fn new(price: f64, amount: f64, encrypted: bool) -> Self {
        Self {
            price,
            amount,
            total: price * amount,
            encrypted,
        }
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn encrypted(&self) -> bool {
        self.encrypted
    }
}

/// Both sides of a synthetic book around a reference mid-price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub mid: f64,
    /// Sell side, nearest-to-mid first.
    pub asks: Vec<OrderRow>,
    /// Buy side, nearest-to-mid first.
    pub bids: Vec<OrderRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Call => "CALL",
            OptionType::Put => "PUT",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionRow {
    pub strike: f64,
    pub call_bid: f64,
    pub call_ask: f64,
    pub call_volume: u32,
    pub call_iv: f64,
    pub put_bid: f64,
    pub put_ask: f64,
    pub put_volume: u32,
    pub put_iv: f64,
    pub encrypted: bool,
}

/// Strike ladder for one expiry, centered on `spot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsChain {
    pub spot: f64,
    pub expiry: NaiveDate,
    pub rows: Vec<OptionRow>,
}

impl OptionsChain {
    /// Index of the at-the-money row: the ladder midpoint.
    pub fn atm_index(&self) -> Option<usize> {
        if self.rows.is_empty() {
            None
        } else {
            Some(self.rows.len() / 2)
        }
    }

    pub fn atm(&self) -> Option<&OptionRow> {
        self.atm_index().and_then(|i| self.rows.get(i))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Symbol {
    Eth,
    Btc,
    Sol,
    Avax,
}

impl Symbol {
    pub const ALL: [Symbol; 4] = [Symbol::Eth, Symbol::Btc, Symbol::Sol, Symbol::Avax];

    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::Eth => "ETH",
            Symbol::Btc => "BTC",
            Symbol::Sol => "SOL",
            Symbol::Avax => "AVAX",
        }
    }

    /// Reference spot used to place synthetic strikes.
    pub fn base_price(&self) -> f64 {
        match self {
            Symbol::Btc => 45_000.0,
            Symbol::Eth => 2_450.0,
            Symbol::Sol => 100.0,
            Symbol::Avax => 60.0,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Symbol {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::ALL
            .iter()
            .copied()
            .find(|sym| sym.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MarketError::invalid("symbol", format!("unknown symbol {s:?}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickerItem {
    pub symbol: Symbol,
    pub strike: f64,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub expiry: NaiveDate,
    pub bid: f64,
    pub ask: f64,
    pub iv: f64,
    pub encrypted: bool,
}
