// Order execution module
pub mod executor;
pub mod position;

pub use executor::{OrderExecutor, SELL_MAX_ATTEMPTS};
pub use position::{OpenPosition, PositionStore};
