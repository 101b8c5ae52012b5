use serde::{Deserialize, Serialize};
use tracing::trace;

use market_core::{Candle, OptionsChain, OrderBook, TickerItem, Timestamp};

pub mod generator;
pub mod source;

pub use generator::{weekly_expiries, GeneratorConfig, MarketSimulator};
pub use source::{Clock, FixedClock, RandomSource, ScriptedRandom, SeededRandom, SystemClock};

/// One regenerated view's worth of data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketEvent {
    Candles(Vec<Candle>),
    OrderBook(OrderBook),
    OptionsChain(OptionsChain),
    Ticker(Vec<TickerItem>),
}

/// Consumer interface for feed events.
pub trait DataSink {
    fn on_event(&mut self, event: MarketEvent);
}

/// Everything the dashboard shows, generated at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub generated_at: Timestamp,
    pub candles: Vec<Candle>,
    pub order_book: OrderBook,
    pub options: OptionsChain,
    pub ticker: Vec<TickerItem>,
}

/// Latest value of each collection. Every event replaces its collection
/// wholesale; nothing is merged or appended.
#[derive(Debug, Clone, Default)]
pub struct MarketStore {
    candles: Vec<Candle>,
    order_book: Option<OrderBook>,
    options: Option<OptionsChain>,
    ticker: Vec<TickerItem>,
    revision: u64,
}

impl MarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: MarketSnapshot) -> Self {
        let mut store = Self::new();
        store.apply_snapshot(snapshot);
        store
    }

    pub fn apply_snapshot(&mut self, snapshot: MarketSnapshot) {
        self.on_event(MarketEvent::Candles(snapshot.candles));
        self.on_event(MarketEvent::OrderBook(snapshot.order_book));
        self.on_event(MarketEvent::OptionsChain(snapshot.options));
        self.on_event(MarketEvent::Ticker(snapshot.ticker));
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn order_book(&self) -> Option<&OrderBook> {
        self.order_book.as_ref()
    }

    pub fn options(&self) -> Option<&OptionsChain> {
        self.options.as_ref()
    }

    pub fn ticker(&self) -> &[TickerItem] {
        &self.ticker
    }

    /// Bumped on every applied event.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl DataSink for MarketStore {
    fn on_event(&mut self, event: MarketEvent) {
        match event {
            MarketEvent::Candles(candles) => self.candles = candles,
            MarketEvent::OrderBook(book) => self.order_book = Some(book),
            MarketEvent::OptionsChain(chain) => self.options = Some(chain),
            MarketEvent::Ticker(items) => self.ticker = items,
        }
        self.revision += 1;
        trace!(revision = self.revision, "market store updated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::OrderRow;

    fn sim() -> MarketSimulator<SeededRandom, FixedClock> {
        MarketSimulator::new(SeededRandom::new(42), FixedClock(1_706_227_200_000))
    }

    #[test]
    fn events_replace_collections() {
        let mut sim = sim();
        let mut store = MarketStore::new();
        assert!(store.order_book().is_none());

        store.on_event(MarketEvent::Ticker(sim.generate_ticker(20).unwrap()));
        store.on_event(MarketEvent::Ticker(sim.generate_ticker(5).unwrap()));
        assert_eq!(store.ticker().len(), 5);

        let book = OrderBook {
            mid: 10.0,
            asks: vec![OrderRow::new(10.5, 1.0, true)],
            bids: vec![],
        };
        store.on_event(MarketEvent::OrderBook(book.clone()));
        assert_eq!(store.order_book(), Some(&book));
        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn snapshot_populates_every_view() {
        let snap = sim().snapshot().unwrap();
        let store = MarketStore::from_snapshot(snap.clone());
        assert_eq!(store.candles(), snap.candles.as_slice());
        assert_eq!(store.options(), Some(&snap.options));
        assert_eq!(store.ticker().len(), 20);
        assert_eq!(store.revision(), 4);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let snap = sim().snapshot().unwrap();
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["candles"].as_array().map(|a| a.len()), Some(50));
        assert!(json["ticker"][0]["type"].is_string());
        assert!(json["options"]["expiry"].is_string());
    }
}
