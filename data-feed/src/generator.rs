//! Synthetic series generation.
//!
//! Every collection is produced in one pass from the injected random source
//! and clock. Invariants (OHLC envelope, ladder monotonicity, derived totals,
//! arithmetic strikes) hold by construction; nothing is corrected after the
//! fact.

use chrono::{DateTime, Datelike, Days, NaiveDate, Weekday};
use market_core::{
    ensure_len, ensure_price, Candle, MarketError, OptionRow, OptionType, OptionsChain, OrderBook,
    OrderRow, OrderSide, Symbol, TickerItem, TimeFrame, Timestamp, DAY_MS,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::source::{Clock, RandomSource};
use crate::MarketSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandleParams {
    pub count: usize,
    pub base_price: f64,
    pub max_volatility: f64,
    pub max_wick: f64,
    pub max_volume: f64,
    pub timeframe: TimeFrame,
}

impl Default for CandleParams {
    fn default() -> Self {
        Self {
            count: 50,
            base_price: 100.0,
            max_volatility: 4.0,
            max_wick: 2.0,
            max_volume: 1_000_000.0,
            timeframe: TimeFrame::Hours(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookParams {
    pub depth: usize,
    pub mid: f64,
    pub step: f64,
    pub min_amount: f64,
    pub amount_span: f64,
}

impl Default for BookParams {
    fn default() -> Self {
        Self {
            depth: 8,
            mid: 2_450.0,
            step: 0.5,
            min_amount: 0.5,
            amount_span: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    pub spot: f64,
    pub steps: usize,
    pub strike_step: f64,
    pub bid_premium: f64,
    pub ask_premium: f64,
    pub max_volume: u32,
    pub iv_floor: f64,
    pub iv_span: f64,
    /// A row is masked when its draw exceeds this.
    pub mask_threshold: f64,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            spot: 2_450.0,
            steps: 5,
            strike_step: 50.0,
            bid_premium: 20.0,
            ask_premium: 25.0,
            max_volume: 1_000,
            iv_floor: 20.0,
            iv_span: 10.0,
            mask_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerParams {
    pub count: usize,
    pub strike_buckets: u32,
    pub strike_pct: f64,
    pub expiry_days: u32,
    pub quote_span: f64,
    pub ask_offset: f64,
    pub iv_floor: f64,
    pub iv_span: f64,
    pub mask_threshold: f64,
}

impl Default for TickerParams {
    fn default() -> Self {
        Self {
            count: 20,
            strike_buckets: 10,
            strike_pct: 0.01,
            expiry_days: 30,
            quote_span: 100.0,
            ask_offset: 5.0,
            iv_floor: 20.0,
            iv_span: 40.0,
            mask_threshold: 0.3,
        }
    }
}

/// All generation constants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub candles: CandleParams,
    pub book: BookParams,
    pub chain: ChainParams,
    pub ticker: TickerParams,
}

/// Generator state: configuration plus the injected random source and clock.
#[derive(Debug, Clone)]
pub struct MarketSimulator<R, C> {
    config: GeneratorConfig,
    rng: R,
    clock: C,
}

impl<R: RandomSource, C: Clock> MarketSimulator<R, C> {
    pub fn new(rng: R, clock: C) -> Self {
        Self::with_config(GeneratorConfig::default(), rng, clock)
    }

    pub fn with_config(config: GeneratorConfig, rng: R, clock: C) -> Self {
        Self { config, rng, clock }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The random source, for views that draw their own noise (masked-cell flicker).
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// A random-walk series of `count` candles in the configured timeframe.
    pub fn generate_candles(&mut self, count: usize) -> Result<Vec<Candle>, MarketError> {
        let timeframe = self.config.candles.timeframe;
        self.generate_candles_in(timeframe, count)
    }

    /// A random-walk series of `count` candles of `timeframe`, the last one
    /// starting one bucket before now.
    pub fn generate_candles_in(
        &mut self,
        timeframe: TimeFrame,
        count: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        ensure_len("count", count)?;
        let p = &self.config.candles;
        let step_ms = timeframe.duration_ms().max(1);
        let now = self.clock.now_ms();
        let start = step_ms
            .checked_mul(count as i64)
            .and_then(|span| now.checked_sub(span))
            .ok_or_else(|| {
                let name = timeframe.name();
                let reason = format!("{count} buckets of {name} overflow the clock");
                MarketError::invalid("timeframe", reason)
            })?;
        let mut candles = Vec::with_capacity(count);
        let mut last_close = p.base_price;

        for i in 0..count {
            let volatility = self.rng.next_unit() * p.max_volatility;
            let sign = if self.rng.above(0.5) { 1.0 } else { -1.0 };
            let open = last_close;
            let close = open + self.rng.next_unit() * volatility * sign;
            let high = open.max(close) + self.rng.next_unit() * p.max_wick;
            let low = open.min(close) - self.rng.next_unit() * p.max_wick;
            let volume = self.rng.next_unit() * p.max_volume;
            let candle = Candle {
                ts: start + i as i64 * step_ms,
                timeframe,
                open,
                high,
                low,
                close,
                volume,
            };
            debug_assert!(candle.is_consistent());
            candles.push(candle);
            last_close = close;
        }

        debug!(count, last_close, "generated candle series");
        Ok(candles)
    }

    /// One side of the book; row `i` sits `(i + 1) * step` away from `mid`.
    ///
    /// Every level must be a positive price distinct from its neighbour, so a
    /// bid ladder deeper than `mid / step` and a mid too large to resolve
    /// `step` are both rejected.
    pub fn generate_order_ladder(
        &mut self,
        side: OrderSide,
        depth: usize,
        mid: f64,
    ) -> Result<Vec<OrderRow>, MarketError> {
        ensure_len("depth", depth)?;
        ensure_price("mid", mid)?;
        let step = self.config.book.step;
        if !step.is_finite() || step <= 0.0 {
            return Err(MarketError::invalid(
                "step",
                format!("must be a finite positive increment (got {step})"),
            ));
        }

        let direction = side.direction();
        let mut prices = Vec::with_capacity(depth);
        let mut previous = mid;
        for i in 0..depth {
            let price = mid + (i + 1) as f64 * step * direction;
            if price <= 0.0 {
                return Err(MarketError::invalid(
                    "mid",
                    format!("{depth} levels of {step} below {mid} reach a non-positive price"),
                ));
            }
            if (price - previous) * direction <= 0.0 {
                return Err(MarketError::invalid(
                    "mid",
                    format!("{mid} is too large to separate levels {step} apart"),
                ));
            }
            prices.push(price);
            previous = price;
        }

        let (min_amount, amount_span) = (self.config.book.min_amount, self.config.book.amount_span);
        let rows = prices
            .into_iter()
            .map(|price| {
                let amount = self.rng.next_unit() * amount_span + min_amount;
                OrderRow::new(price, amount, true)
            })
            .collect();
        Ok(rows)
    }

    pub fn generate_order_book(
        &mut self,
        depth: usize,
        mid: f64,
    ) -> Result<OrderBook, MarketError> {
        let asks = self.generate_order_ladder(OrderSide::Sell, depth, mid)?;
        let bids = self.generate_order_ladder(OrderSide::Buy, depth, mid)?;
        Ok(OrderBook { mid, asks, bids })
    }

    /// `2 * steps + 1` strikes centered on `spot`, expiring on the nearest weekly expiry.
    pub fn generate_options_chain(
        &mut self,
        spot: f64,
        steps: usize,
    ) -> Result<OptionsChain, MarketError> {
        ensure_price("spot", spot)?;
        let rows_len = steps.saturating_mul(2).saturating_add(1);
        ensure_len("steps", rows_len)?;
        let p = self.config.chain.clone();
        let half = steps as i64;
        let mut rows = Vec::with_capacity(rows_len);

        for k in -half..=half {
            let strike = spot + k as f64 * p.strike_step;
            let call_intrinsic = spot - strike;
            let put_intrinsic = strike - spot;

            let call_bid = (call_intrinsic + self.rng.next_unit() * p.bid_premium).max(0.0);
            let call_ask =
                (call_intrinsic + self.rng.next_unit() * p.ask_premium).max(call_bid);
            let call_volume = (self.rng.next_unit() * p.max_volume as f64).floor() as u32;
            let put_bid = (put_intrinsic + self.rng.next_unit() * p.bid_premium).max(0.0);
            let put_ask = (put_intrinsic + self.rng.next_unit() * p.ask_premium).max(put_bid);
            let put_volume = (self.rng.next_unit() * p.max_volume as f64).floor() as u32;
            let call_iv = p.iv_floor + self.rng.next_unit() * p.iv_span;
            let put_iv = p.iv_floor + self.rng.next_unit() * p.iv_span;
            let encrypted = self.rng.above(p.mask_threshold);

            rows.push(OptionRow {
                strike,
                call_bid,
                call_ask,
                call_volume,
                call_iv,
                put_bid,
                put_ask,
                put_volume,
                put_iv,
                encrypted,
            });
        }

        let [expiry, ..] = weekly_expiries(self.clock.now_ms()).ok_or_else(out_of_calendar)?;
        Ok(OptionsChain { spot, expiry, rows })
    }

    pub fn generate_ticker(&mut self, count: usize) -> Result<Vec<TickerItem>, MarketError> {
        ensure_len("count", count)?;
        let p = self.config.ticker.clone();
        let now = self.clock.now_ms();
        let mut items = Vec::with_capacity(count);

        for _ in 0..count {
            let symbol = Symbol::ALL[self.rng.index(Symbol::ALL.len())];
            let base = symbol.base_price();
            let bucket = self.rng.index(p.strike_buckets as usize) as f64
                - (p.strike_buckets / 2) as f64;
            let strike = base + bucket * base * p.strike_pct;
            let option_type = if self.rng.above(0.5) {
                OptionType::Call
            } else {
                OptionType::Put
            };
            let expiry_offset =
                (self.rng.next_unit() * p.expiry_days as f64 * DAY_MS as f64) as i64;
            let bid = self.rng.next_unit() * p.quote_span;
            let ask = (self.rng.next_unit() * p.quote_span + p.ask_offset).max(bid);
            let iv = p.iv_floor + self.rng.next_unit() * p.iv_span;
            let encrypted = self.rng.above(p.mask_threshold);

            items.push(TickerItem {
                symbol,
                strike,
                option_type,
                expiry: date_of(now.saturating_add(expiry_offset)).ok_or_else(out_of_calendar)?,
                bid,
                ask,
                iv,
                encrypted,
            });
        }
        Ok(items)
    }

    /// Every view's data at the configured defaults.
    pub fn snapshot(&mut self) -> Result<MarketSnapshot, MarketError> {
        let candle_count = self.config.candles.count;
        let (depth, mid) = (self.config.book.depth, self.config.book.mid);
        let (spot, steps) = (self.config.chain.spot, self.config.chain.steps);
        let ticker_count = self.config.ticker.count;

        Ok(MarketSnapshot {
            generated_at: self.clock.now_ms(),
            candles: self.generate_candles(candle_count)?,
            order_book: self.generate_order_book(depth, mid)?,
            options: self.generate_options_chain(spot, steps)?,
            ticker: self.generate_ticker(ticker_count)?,
        })
    }
}

fn out_of_calendar() -> MarketError {
    MarketError::invalid("now", "clock reading is outside the supported calendar range")
}

/// Calendar date (UTC) of a timestamp, `None` outside chrono's range.
pub fn date_of(ts: Timestamp) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(ts).map(|dt| dt.date_naive())
}

/// The next three Friday expiries strictly after the date of `now`.
pub fn weekly_expiries(now: Timestamp) -> Option<[NaiveDate; 3]> {
    let today = date_of(now)?;
    let from_monday = today.weekday().num_days_from_monday();
    let friday = Weekday::Fri.num_days_from_monday();
    let mut ahead = (friday + 7 - from_monday) % 7;
    if ahead == 0 {
        ahead = 7;
    }
    let first = today.checked_add_days(Days::new(ahead as u64))?;
    let second = first.checked_add_days(Days::new(7))?;
    let third = second.checked_add_days(Days::new(7))?;
    Some([first, second, third])
}
