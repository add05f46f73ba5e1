pub mod kraken;
pub mod trader;

pub use kraken::KrakenClient;
pub use trader::{Trader, TraderHandle};
