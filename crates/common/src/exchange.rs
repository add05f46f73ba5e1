use async_trait::async_trait;

use crate::{Candle, OrderBook, OrderReceipt, Result};

/// Abstraction over the exchange connection.
///
/// `KrakenClient` implements this for live trading. Tests substitute
/// scripted stand-ins so the trading loop can run without the network.
///
/// Only the `Trader` in `crates/engine` should hold a reference to a
/// `dyn ExchangeApi`; strategies see candles, never the connection.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Fetch OHLC candles for a pair, oldest first. The last entry is the
    /// still-forming candle for the current interval.
    async fn candles(&self, pair: &str, interval_minutes: u32) -> Result<Vec<Candle>>;

    /// Fetch the current order book for a pair, best price first.
    async fn order_book(&self, pair: &str) -> Result<OrderBook>;

    /// Maker fee for a pair as a percentage, e.g. 0.16 for 0.16%.
    async fn maker_fee(&self, pair: &str) -> Result<f64>;

    /// Available balance in the given currency.
    async fn balance(&self, currency: &str) -> Result<f64>;

    /// Submit a post-only limit buy and return the exchange's receipt.
    async fn place_buy_order(&self, pair: &str, volume: f64, price: f64) -> Result<OrderReceipt>;
}
