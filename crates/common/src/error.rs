use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Exchange error: {}", .0.join("; "))]
    Exchange(Vec<String>),

    #[error("Exchange is not operational (status: {0})")]
    ServiceUnavailable(String),

    #[error("Unknown trading pair: {0}")]
    UnknownPair(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Unknown strategy type: {0}")]
    UnknownStrategy(String),

    #[error("Invalid order volume: {0}")]
    InvalidVolume(f64),

    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: f64, available: f64 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_error_joins_messages() {
        let err = Error::Exchange(vec![
            "EGeneral:Invalid arguments".into(),
            "EOrder:Insufficient margin".into(),
        ]);
        assert_eq!(
            err.to_string(),
            "Exchange error: EGeneral:Invalid arguments; EOrder:Insufficient margin"
        );
    }

    #[test]
    fn insufficient_funds_reports_both_sides() {
        let err = Error::InsufficientFunds {
            needed: 100.0,
            available: 50.0,
        };
        assert_eq!(err.to_string(), "Insufficient funds: need 100, have 50");
    }
}
