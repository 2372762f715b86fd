pub mod exchange_rate_api;
pub mod observability;
pub mod simulated;
