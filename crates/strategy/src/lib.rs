pub mod factory;
pub mod indicators;

pub use factory::build_strategies;

use common::{Buy, Candle};

/// All strategy implementations must satisfy this trait.
pub trait Strategy: Send + Sync {
    /// The configuration tag this strategy was built from, e.g. "sma_20".
    fn kind(&self) -> &'static str;

    /// Evaluate the latest candle history and optionally emit a buy.
    ///
    /// Candles arrive oldest first; the last entry is the still-forming
    /// candle for the current interval. Called once per polling tick.
    /// Returns `None` when no action is warranted.
    fn update(&mut self, candles: &[Candle]) -> Option<Buy>;
}
