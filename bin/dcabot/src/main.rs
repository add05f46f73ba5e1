use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{ConfigPaths, Credentials, ExchangeApi, Settings};
use engine::{KrakenClient, Trader};
use strategy::build_strategies;

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    info!("Starting up");

    // ── Config ────────────────────────────────────────────────────────────────
    let paths = ConfigPaths::from_env();
    let settings =
        Settings::load(&paths.settings).unwrap_or_else(|e| panic!("Failed to load settings: {e}"));
    let credentials = Credentials::load(&paths.credentials)
        .unwrap_or_else(|e| panic!("Failed to load credentials: {e}"));

    // ── Exchange client ───────────────────────────────────────────────────────
    let client = KrakenClient::connect(credentials)
        .await
        .unwrap_or_else(|e| panic!("Failed to connect to exchange: {e}"));

    match client.asset_pair(&settings.trade.trade_symbol).await {
        Ok(pair_info) => info!(
            pair = %settings.trade.trade_symbol,
            altname = %pair_info.altname,
            ordermin = pair_info.ordermin,
            lot_decimals = pair_info.lot_decimals,
            "Trading pair confirmed"
        ),
        Err(e) => panic!(
            "Unusable trading pair '{}': {e}",
            settings.trade.trade_symbol
        ),
    }

    // ── Strategies ────────────────────────────────────────────────────────────
    let strategies = build_strategies(&settings.strategies)
        .unwrap_or_else(|e| panic!("Invalid strategy configuration: {e}"));
    if strategies.is_empty() {
        warn!("No strategies configured, the loop will only watch the market");
    }

    // ── Trading loop ──────────────────────────────────────────────────────────
    let exchange: Arc<dyn ExchangeApi> = Arc::new(client);
    let (trader, handle) = Trader::new(exchange, strategies, settings.trade);
    let task = tokio::spawn(trader.run());

    tokio::signal::ctrl_c().await.unwrap();
    info!("Shutdown signal received");
    handle.stop().await;
    let _ = task.await;

    info!("Finished");
}
