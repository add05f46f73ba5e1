use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC candle from the exchange.
///
/// The wire format is a fixed-width row
/// `[time, open, high, low, close, vwap, volume, count]` with decimal fields
/// sent as strings; the REST client coerces them before handing candles out.
/// The final candle of a fetched history is still forming and must not feed
/// moving averages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time, unix seconds.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Volume-weighted average price over the candle.
    pub vwap: f64,
    pub volume: f64,
    /// Number of trades inside the candle.
    pub count: u64,
}

impl Candle {
    pub fn time_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.time, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// A single price level of the order book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderBookEntry {
    pub price: f64,
    pub volume: f64,
}

/// Order book snapshot. Asks come sorted by ascending price, bids by
/// descending price, exactly as the exchange delivers them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
    pub asks: Vec<OrderBookEntry>,
    pub bids: Vec<OrderBookEntry>,
}

impl OrderBook {
    /// The highest bid, i.e. the price a post-only buy order rests at.
    pub fn best_bid(&self) -> Option<OrderBookEntry> {
        self.bids.first().copied()
    }
}

/// Buy signal emitted by a strategy. `amount` is the spend in the quote
/// currency, not a volume in the base asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Buy {
    pub amount: f64,
}

/// Acknowledgement returned by the exchange for a placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// Transaction ids assigned by the exchange.
    pub txids: Vec<String>,
    /// Human-readable order description, e.g. "buy 0.002 XBTCHF @ limit 50000".
    pub description: String,
}

/// Static metadata for a trading pair, used to validate the configured
/// symbol at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetPairInfo {
    pub altname: String,
    pub base: String,
    pub quote: String,
    /// Price precision in decimal places.
    pub pair_decimals: u32,
    /// Volume precision in decimal places.
    pub lot_decimals: u32,
    /// Minimum order volume in the base asset.
    pub ordermin: f64,
}

/// Current phase of the trading loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TraderState {
    #[default]
    Idle,
    Fetching,
    Evaluating,
    Buying,
    Sleeping,
    Stopped,
}

impl std::fmt::Display for TraderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraderState::Idle => write!(f, "idle"),
            TraderState::Fetching => write!(f, "fetching"),
            TraderState::Evaluating => write!(f, "evaluating"),
            TraderState::Buying => write!(f, "buying"),
            TraderState::Sleeping => write!(f, "sleeping"),
            TraderState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Commands sent to the trader via its command channel.
#[derive(Debug, Clone)]
pub enum TraderCommand {
    Stop,
}
