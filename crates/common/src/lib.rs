pub mod config;
pub mod error;
pub mod exchange;
pub mod types;

pub use config::{ConfigPaths, Credentials, Settings, StrategyConfig, TradeSettings};
pub use error::{Error, Result};
pub use exchange::ExchangeApi;
pub use types::*;
