//! A prediction-market sniping engine: scans political/news-driven markets,
//! listens for the triggering events that move them, tracks smart money, and
//! paper-trades the resulting signals.

pub mod config;
pub mod executor;
pub mod listener;
pub mod models;
pub mod notifier;
pub mod portfolio;
pub mod publisher;
pub mod radar;
pub mod smart_money;
pub mod store;
pub mod utils;

pub use config::AppConfig;
pub use models::{TradingError, TradingResult};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        assert!(!VERSION.is_empty());
        assert!(!NAME.is_empty());
    }
}
