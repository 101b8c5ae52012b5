use std::sync::Arc;

use chart_frontend::CandleChartRenderer;
use data_feed::{DataSink, MarketEvent, MarketSimulator, MarketStore, SeededRandom, SystemClock};
use market_core::{MarketError, StubGateway};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::Config;

pub type Simulator = MarketSimulator<SeededRandom, SystemClock>;

/// Shared by every handler. The simulator sits behind a mutex so each
/// generation call sees a consistent random stream.
#[derive(Clone)]
pub struct AppState {
    pub market: Arc<Mutex<Simulator>>,
    /// Latest published views; the refresh task replaces the ticker tape here.
    pub store: Arc<RwLock<MarketStore>>,
    pub gateway: Arc<Mutex<StubGateway>>,
    pub renderer: Arc<CandleChartRenderer>,
}

impl AppState {
    pub fn new(simulator: Simulator, gateway: StubGateway) -> Self {
        Self::with_store(simulator, MarketStore::new(), gateway)
    }

    pub fn with_store(simulator: Simulator, store: MarketStore, gateway: StubGateway) -> Self {
        Self {
            market: Arc::new(Mutex::new(simulator)),
            store: Arc::new(RwLock::new(store)),
            gateway: Arc::new(Mutex::new(gateway)),
            renderer: Arc::new(CandleChartRenderer::default()),
        }
    }
}

/// Seed the store with a full snapshot so every view has data before the
/// first refresh tick.
pub async fn build_state(config: &Config) -> Result<AppState, MarketError> {
    let rng = match config.seed {
        Some(seed) => {
            info!(seed, "using fixed generator seed");
            SeededRandom::new(seed)
        }
        None => SeededRandom::from_entropy(),
    };
    let mut simulator = MarketSimulator::new(rng, SystemClock);
    let store = MarketStore::from_snapshot(simulator.snapshot()?);
    info!(revision = store.revision(), "market store seeded");
    Ok(AppState::with_store(
        simulator,
        store,
        StubGateway::new(config.wallet_address.clone()),
    ))
}

/// Regenerate the ticker tape and publish it. Returns the new tape length.
pub async fn refresh_ticker(state: &AppState) -> Result<usize, MarketError> {
    let items = {
        let mut market = state.market.lock().await;
        let count = market.config().ticker.count;
        market.generate_ticker(count)?
    };
    let len = items.len();
    let mut store = state.store.write().await;
    store.on_event(MarketEvent::Ticker(items));
    debug!(len, revision = store.revision(), "ticker tape refreshed");
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_state_seeds_every_view() {
        let seed = |key: &str| (key == "HOLO_SEED").then(|| "5".to_string());
        let config = Config::from_lookup(seed).unwrap();
        let state = build_state(&config).await.unwrap();
        let store = state.store.read().await;
        assert_eq!(store.candles().len(), 50);
        assert!(store.order_book().is_some());
        assert!(store.options().is_some());
        assert_eq!(store.ticker().len(), 20);
        assert_eq!(store.revision(), 4);
    }

    #[tokio::test]
    async fn refresh_publishes_through_the_store() {
        let state = AppState::new(
            MarketSimulator::new(SeededRandom::new(3), SystemClock),
            StubGateway::new(None),
        );
        assert_eq!(refresh_ticker(&state).await.unwrap(), 20);
        assert_eq!(refresh_ticker(&state).await.unwrap(), 20);
        let store = state.store.read().await;
        assert_eq!(store.ticker().len(), 20);
        assert_eq!(store.revision(), 2);
    }
}
