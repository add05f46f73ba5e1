use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use common::{
    AssetPairInfo, Candle, Credentials, Error, ExchangeApi, OrderBook, OrderBookEntry,
    OrderReceipt, Result,
};

use crate::kraken::sign::{build_body, sign_request, NonceSource};

const BASE_URL: &str = "https://api.kraken.com";
const USER_AGENT: &str = "kraken_dca_agent";

/// Unfilled orders are cancelled by the exchange after a day.
const ORDER_EXPIRY_SECS: u64 = 24 * 60 * 60;

/// REST API client for Kraken. Signs private calls and decodes the common
/// `{error: [...], result: {...}}` response envelope.
pub struct KrakenClient {
    credentials: Credentials,
    nonces: NonceSource,
    http: Client,
}

impl KrakenClient {
    /// Build a client and verify the exchange reports itself online, so the
    /// trading loop never starts against an exchange in maintenance.
    pub async fn connect(credentials: Credentials) -> Result<Self> {
        let client = Self {
            credentials,
            nonces: NonceSource::new(),
            http: Client::builder()
                .user_agent(USER_AGENT)
                .use_rustls_tls()
                .build()
                .expect("Failed to build HTTP client"),
        };

        client.check_status().await?;
        info!("Exchange is online");
        Ok(client)
    }

    async fn check_status(&self) -> Result<()> {
        let result = self.public_get("/0/public/SystemStatus").await?;
        parse_system_status(result)
    }

    /// Asset pair metadata, used at startup to confirm the configured symbol
    /// exists and to surface its precision limits.
    pub async fn asset_pair(&self, pair: &str) -> Result<AssetPairInfo> {
        let result = self
            .public_get(&format!("/0/public/AssetPairs?pair={pair}"))
            .await?;
        parse_asset_pair(result, pair)
    }

    async fn public_get(&self, path_and_query: &str) -> Result<Value> {
        debug!(path = path_and_query, "Calling public endpoint");
        let resp = self
            .http
            .get(format!("{BASE_URL}{path_and_query}"))
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Transport(format!("HTTP {status}: {body}")));
        }
        decode_envelope(&body)
    }

    /// The signature covers the exact body string, so the body built here is
    /// the one sent, byte for byte.
    async fn private_post(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let nonce = self.nonces.next();
        let body = build_body(nonce, params);
        let signature = sign_request(&self.credentials.private_key, path, nonce, &body)?;

        debug!(path, "Calling private endpoint");
        let resp = self
            .http
            .post(format!("{BASE_URL}{path}"))
            .header("API-Key", &self.credentials.api_key)
            .header("API-Sign", signature)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Transport(format!("HTTP {status}: {text}")));
        }
        decode_envelope(&text)
    }
}

#[async_trait]
impl ExchangeApi for KrakenClient {
    async fn candles(&self, pair: &str, interval_minutes: u32) -> Result<Vec<Candle>> {
        let result = self
            .public_get(&format!(
                "/0/public/OHLC?pair={pair}&interval={interval_minutes}"
            ))
            .await?;
        parse_candles(result, pair)
    }

    async fn order_book(&self, pair: &str) -> Result<OrderBook> {
        let result = self
            .public_get(&format!("/0/public/Depth?pair={pair}"))
            .await?;
        parse_order_book(result, pair)
    }

    async fn maker_fee(&self, pair: &str) -> Result<f64> {
        let result = self
            .private_post("/0/private/TradeVolume", &[("pair", pair.to_string())])
            .await?;
        parse_maker_fee(result, pair)
    }

    async fn balance(&self, currency: &str) -> Result<f64> {
        let result = self.private_post("/0/private/Balance", &[]).await?;
        parse_balance(result, currency)
    }

    async fn place_buy_order(&self, pair: &str, volume: f64, price: f64) -> Result<OrderReceipt> {
        if volume <= 0.0 {
            return Err(Error::InvalidVolume(volume));
        }

        let params = [
            ("pair", pair.to_string()),
            ("type", "buy".to_string()),
            ("ordertype", "limit".to_string()),
            ("price", price.to_string()),
            // post-only, so the order never crosses the book into taker fees
            ("oflags", "post".to_string()),
            ("volume", volume.to_string()),
            // relative expiry; the "+" must reach the wire percent-encoded
            ("expiretm", format!("%2b{ORDER_EXPIRY_SECS}")),
        ];

        info!(pair, volume, price, "Placing limit buy order");
        let result = self.private_post("/0/private/AddOrder", &params).await?;
        parse_receipt(result)
    }
}

// ─── Response decoding ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: Option<Value>,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
}

/// OHLC row: [time, open, high, low, close, vwap, volume, count].
#[derive(Deserialize)]
struct RawCandle(i64, String, String, String, String, String, String, u64);

#[derive(Deserialize)]
struct RawDepth {
    asks: Vec<RawDepthEntry>,
    bids: Vec<RawDepthEntry>,
}

/// Depth row: [price, volume, timestamp].
#[derive(Deserialize)]
struct RawDepthEntry(String, String, i64);

#[derive(Deserialize)]
struct RawReceipt {
    #[serde(default)]
    txid: Vec<String>,
    descr: RawOrderDescription,
}

#[derive(Deserialize)]
struct RawOrderDescription {
    order: String,
}

#[derive(Deserialize)]
struct RawAssetPair {
    altname: String,
    base: String,
    quote: String,
    pair_decimals: u32,
    lot_decimals: u32,
    ordermin: String,
}

fn decode_envelope(body: &str) -> Result<Value> {
    let envelope: RawEnvelope = serde_json::from_str(body)
        .map_err(|e| Error::Parse(format!("malformed response envelope: {e}")))?;

    if !envelope.error.is_empty() {
        return Err(Error::Exchange(envelope.error));
    }
    envelope
        .result
        .ok_or_else(|| Error::Parse("response envelope lacks a result".to_string()))
}

fn parse_f64(raw: &str, what: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|_| Error::Parse(format!("bad {what}: '{raw}'")))
}

fn parse_system_status(result: Value) -> Result<()> {
    let status: StatusResponse = serde_json::from_value(result)?;
    if status.status != "online" {
        return Err(Error::ServiceUnavailable(status.status));
    }
    Ok(())
}

fn parse_candles(result: Value, pair: &str) -> Result<Vec<Candle>> {
    let series = result
        .get(pair)
        .cloned()
        .ok_or_else(|| Error::UnknownPair(pair.to_string()))?;
    let raw: Vec<RawCandle> = serde_json::from_value(series)?;

    raw.into_iter()
        .map(|row| {
            Ok(Candle {
                time: row.0,
                open: parse_f64(&row.1, "open")?,
                high: parse_f64(&row.2, "high")?,
                low: parse_f64(&row.3, "low")?,
                close: parse_f64(&row.4, "close")?,
                vwap: parse_f64(&row.5, "vwap")?,
                volume: parse_f64(&row.6, "volume")?,
                count: row.7,
            })
        })
        .collect()
}

fn parse_order_book(result: Value, pair: &str) -> Result<OrderBook> {
    let book = result
        .get(pair)
        .cloned()
        .ok_or_else(|| Error::UnknownPair(pair.to_string()))?;
    let raw: RawDepth = serde_json::from_value(book)?;

    let entry = |row: &RawDepthEntry| -> Result<OrderBookEntry> {
        Ok(OrderBookEntry {
            price: parse_f64(&row.0, "price")?,
            volume: parse_f64(&row.1, "volume")?,
        })
    };

    Ok(OrderBook {
        asks: raw.asks.iter().map(entry).collect::<Result<_>>()?,
        bids: raw.bids.iter().map(entry).collect::<Result<_>>()?,
    })
}

fn parse_maker_fee(result: Value, pair: &str) -> Result<f64> {
    let fees = result
        .get("fees_maker")
        .ok_or_else(|| Error::Parse("trade volume response lacks fees_maker".to_string()))?;
    let raw = fees
        .get(pair)
        .ok_or_else(|| Error::UnknownPair(pair.to_string()))?
        .get("fee")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Parse("fee entry lacks a fee field".to_string()))?;
    parse_f64(raw, "maker fee")
}

fn parse_balance(result: Value, currency: &str) -> Result<f64> {
    let balances: HashMap<String, String> = serde_json::from_value(result)?;
    let raw = balances
        .get(currency)
        .ok_or_else(|| Error::UnknownCurrency(currency.to_string()))?;
    parse_f64(raw, "balance")
}

fn parse_receipt(result: Value) -> Result<OrderReceipt> {
    let raw: RawReceipt = serde_json::from_value(result)?;
    Ok(OrderReceipt {
        txids: raw.txid,
        description: raw.descr.order,
    })
}

fn parse_asset_pair(result: Value, pair: &str) -> Result<AssetPairInfo> {
    let info = result
        .get(pair)
        .cloned()
        .ok_or_else(|| Error::UnknownPair(pair.to_string()))?;
    let raw: RawAssetPair = serde_json::from_value(info)?;

    Ok(AssetPairInfo {
        altname: raw.altname,
        base: raw.base,
        quote: raw.quote,
        pair_decimals: raw.pair_decimals,
        lot_decimals: raw.lot_decimals,
        ordermin: parse_f64(&raw.ordermin, "ordermin")?,
    })
}
