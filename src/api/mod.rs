pub mod client;
pub mod market;

pub use client::SignedClient;
pub use market::MarketData;
