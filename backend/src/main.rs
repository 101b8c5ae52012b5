//! HTTP front for the synthetic market: candles, masked tables, rendered chart
//! frames and the stub trade gateway.

use tokio::time::{interval, MissedTickBehavior};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod error;
mod routes;
mod state;

use config::Config;
use state::{build_state, refresh_ticker, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,tower_http=info"))?;
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = Config::from_env()?;
    let state = build_state(&config).await?;

    tokio::spawn(run_ticker_refresh(state.clone(), config.ticker_refresh));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, wallet = config.wallet_address.is_some(), "backend listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Regenerate the ticker tape every `period`. The first tick fires immediately
/// but the tape was already filled at startup, so it is skipped.
async fn run_ticker_refresh(state: AppState, period: std::time::Duration) {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer.tick().await;
    loop {
        timer.tick().await;
        if let Err(err) = refresh_ticker(&state).await {
            warn!(%err, "ticker refresh failed");
        }
    }
}
