mod handler;
mod model;

pub use handler::get_exchange_rates;
pub use model::{ExchangeRates, fallback_rates};
