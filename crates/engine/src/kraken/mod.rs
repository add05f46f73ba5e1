pub mod rest;
pub mod sign;

pub use rest::KrakenClient;
