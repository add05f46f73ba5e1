use serde::Deserialize;
use tracing::info;

use crate::{Error, Result};

/// Locations of the two configuration files, overridable through the
/// environment. Loads `.env` if present.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub settings: String,
    pub credentials: String,
}

impl ConfigPaths {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        Self {
            settings: optional_env("SETTINGS_PATH").unwrap_or_else(|| "settings.json".to_string()),
            credentials: optional_env("CREDENTIALS_PATH")
                .unwrap_or_else(|| "authentication.json".to_string()),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Exchange API credentials. The private key is the base64-encoded signing
/// secret issued with the key pair; it never appears in logs.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub api_key: String,
    pub private_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct CredentialsFile {
    kraken: Credentials,
}

impl Credentials {
    /// Load credentials from a JSON file of the form
    /// `{ "kraken": { "apiKey": "...", "privateKey": "..." } }`.
    pub fn load(path: &str) -> Result<Self> {
        info!(path, "Reading credentials");
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read credentials file '{path}': {e}")))?;
        Self::parse(&raw)
            .map_err(|e| Error::Config(format!("invalid credentials file '{path}': {e}")))
    }

    fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let file: CredentialsFile = serde_json::from_str(raw)?;
        Ok(file.kraken)
    }
}

/// Trade parameters shared read-only by the trading loop and the strategies.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSettings {
    /// Trading pair in the exchange's canonical notation, e.g. "XXBTZCHF".
    pub trade_symbol: String,
    /// Polling interval in minutes; also the OHLC candle interval.
    pub trade_interval: u32,
    /// When true, buys are logged but never sent to the exchange.
    pub dummy_mode: bool,
    /// Currency the buy amounts and the balance check are denominated in.
    #[serde(default = "default_quote_currency")]
    pub quote_currency: String,
}

fn default_quote_currency() -> String {
    "CHF".to_string()
}

/// One entry of the `strategies` array. `type` selects the variant; the
/// factory in `crates/strategy` validates the variant-specific fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyConfig {
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Spend per buy, in the quote currency.
    pub amount: f64,
    /// Day of week (0 = Monday) for the scheduled variant.
    #[serde(default)]
    pub day: Option<u8>,
    /// Hour of day (0-23) for the scheduled variant.
    #[serde(default)]
    pub hour: Option<u8>,
    /// Minimum dip, as a fraction of the latest average, for the dip variant.
    #[serde(default)]
    pub min_dip_percentage: Option<f64>,
}

/// Full contents of `settings.json`: the trade section plus the list of
/// strategies to run.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(rename = "settings")]
    pub trade: TradeSettings,
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
}

impl Settings {
    pub fn load(path: &str) -> Result<Self> {
        info!(path, "Reading settings");
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read settings file '{path}': {e}")))?;
        Self::parse(&raw).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("settings file '{path}': {msg}")),
            other => other,
        })
    }

    fn parse(raw: &str) -> Result<Self> {
        let settings: Settings =
            serde_json::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        if settings.trade.trade_interval == 0 {
            return Err(Error::Config(
                "tradeInterval must be a positive number of minutes".to_string(),
            ));
        }
        Ok(settings)
    }
}
