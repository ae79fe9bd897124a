/*!
Layered configuration for the sniping engine.

Precedence, highest first: process environment, an optional
environment-specific TOML overlay (`config/{env}.toml`), the base TOML file
(`config/default.toml`), then the hard-coded [`Default`] values below.

Per the composition-root design note, there is no process-wide global here:
`AppConfig::load` returns an owned value that the caller threads through the
services it constructs.
*/

use crate::models::{TradingError, TradingResult};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub radar: RadarConfig,
    pub listener: ListenerConfig,
    pub smart_money: SmartMoneyConfig,
    pub executor: ExecutorConfig,
    pub portfolio: PortfolioConfig,
    pub messenger: MessengerConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarConfig {
    pub exchange_base_url: String,
    pub cache_ttl_seconds: u64,
    pub http_timeout_seconds: u64,
    pub search_queries: Vec<String>,
    pub search_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub cycle_interval_seconds: u64,
    pub error_recovery_seconds: u64,
    pub target_refresh_cycles: u64,
    pub rss_feeds: Vec<String>,
    pub social_base_url: String,
    pub posts_per_handle: u32,
    pub news_entries_per_feed: u32,
    pub seen_cap: usize,
    pub seen_prune_to: usize,
    pub seen_max_age_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartMoneyConfig {
    pub time_window_seconds: i64,
    pub min_wallets: usize,
    pub min_cumulative_size: f64,
    pub ring_capacity: usize,
    pub gc_age_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub min_confidence: f64,
    pub min_bet: f64,
    pub max_bet_pct: f64,
    pub base_bet_pct: f64,
    pub max_trades_per_day: u32,
    pub min_volume: f64,
    pub min_signal_quality: f64,
    pub signal_quality_weight: f64,
    pub market_quality_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    pub initial_capital: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessengerConfig {
    pub base_url: String,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub timeout_seconds: u64,
}

impl MessengerConfig {
    pub fn enabled(&self) -> bool {
        self.bot_token.as_deref().is_some_and(|t| !t.is_empty())
            && self.chat_id.as_deref().is_some_and(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub connection_url: String,
    pub max_pool_size: usize,
    pub connection_timeout_seconds: u64,
    pub default_ttl_seconds: u64,
    pub wallet_score_ttl_seconds: u64,
    pub signal_recency_cap: isize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            exchange_base_url: "https://gamma-api.polymarket.com".to_string(),
            cache_ttl_seconds: 300,
            http_timeout_seconds: 10,
            search_queries: vec![
                "tweet say".to_string(),
                "announce before".to_string(),
                "speech mention".to_string(),
                "trump elon".to_string(),
                "biden president".to_string(),
                "crypto mention".to_string(),
            ],
            search_limit: 500,
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            cycle_interval_seconds: 2,
            error_recovery_seconds: 5,
            target_refresh_cycles: 10,
            rss_feeds: vec![
                "https://news.google.com/rss/search?q=Trump+OR+Elon+Musk&hl=en-US&gl=US&ceid=US:en"
                    .to_string(),
                "https://finance.yahoo.com/news/rssindex".to_string(),
            ],
            social_base_url: "https://nitter.net".to_string(),
            posts_per_handle: 5,
            news_entries_per_feed: 10,
            seen_cap: 1000,
            seen_prune_to: 500,
            seen_max_age_hours: 24,
        }
    }
}

impl Default for SmartMoneyConfig {
    fn default() -> Self {
        Self {
            time_window_seconds: 30,
            min_wallets: 3,
            min_cumulative_size: 500.0,
            ring_capacity: 100,
            gc_age_seconds: 300,
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.50,
            min_bet: 10.0,
            max_bet_pct: 0.05,
            base_bet_pct: 0.02,
            max_trades_per_day: 20,
            min_volume: 5000.0,
            min_signal_quality: 0.40,
            signal_quality_weight: 0.60,
            market_quality_weight: 0.40,
        }
    }
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
        }
    }
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.telegram.org".to_string(),
            bot_token: None,
            chat_id: None,
            timeout_seconds: 10,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            connection_url: "redis://127.0.0.1:6379".to_string(),
            max_pool_size: 10,
            connection_timeout_seconds: 5,
            default_ttl_seconds: 3600,
            wallet_score_ttl_seconds: 3600,
            signal_recency_cap: 99,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            radar: RadarConfig::default(),
            listener: ListenerConfig::default(),
            smart_money: SmartMoneyConfig::default(),
            executor: ExecutorConfig::default(),
            portfolio: PortfolioConfig::default(),
            messenger: MessengerConfig::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from an optional base file, an optional environment-specific
    /// overlay selected by `APP_ENV`, and the process environment
    /// (`.env` first, via `dotenvy`), in ascending precedence.
    pub fn load() -> TradingResult<Self> {
        let _ = dotenvy::dotenv();

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        // Sources are layered lowest-precedence-first: each add_source call
        // outranks the ones before it, so defaults go in first and the
        // process environment goes in last.
        let base = config::Config::try_from(&AppConfig::default())
            .map_err(|e| TradingError::ConfigError(e.to_string()))?;
        let builder = config::Config::builder()
            .add_source(base)
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::File::with_name(&format!("config/{app_env}")).required(false),
            )
            .add_source(config::Environment::with_prefix("SNIPER").separator("__"));

        let built = builder
            .build()
            .map_err(|e| TradingError::ConfigError(e.to_string()))?;

        let mut cfg: AppConfig = built
            .try_deserialize()
            .map_err(|e| TradingError::ConfigError(e.to_string()))?;

        if let Ok(token) = env::var("TELEGRAM_BOT_TOKEN") {
            cfg.messenger.bot_token = Some(token);
        }
        if let Ok(chat_id) = env::var("TELEGRAM_CHAT_ID") {
            cfg.messenger.chat_id = Some(chat_id);
        }
        if let Ok(url) = env::var("DRAGONFLY_URL") {
            cfg.store.connection_url = url;
        }
        if let Ok(level) = env::var("RUST_LOG") {
            cfg.logging.level = level;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> TradingResult<()> {
        if self.portfolio.initial_capital <= 0.0 {
            return Err(TradingError::ConfigError(
                "portfolio.initial_capital must be > 0".to_string(),
            ));
        }
        if self.radar.search_queries.is_empty() {
            return Err(TradingError::ConfigError(
                "radar.search_queries must not be empty".to_string(),
            ));
        }
        if self.executor.max_bet_pct <= 0.0 || self.executor.max_bet_pct > 1.0 {
            return Err(TradingError::ConfigError(
                "executor.max_bet_pct must be in (0, 1]".to_string(),
            ));
        }
        if self.smart_money.min_wallets == 0 {
            return Err(TradingError::ConfigError(
                "smart_money.min_wallets must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn messenger_disabled_without_credentials() {
        assert!(!MessengerConfig::default().enabled());
    }

    #[test]
    fn messenger_enabled_with_credentials() {
        let cfg = MessengerConfig {
            bot_token: Some("token".to_string()),
            chat_id: Some("chat".to_string()),
            ..MessengerConfig::default()
        };
        assert!(cfg.enabled());
    }

    #[test]
    fn rejects_nonpositive_capital() {
        let mut cfg = AppConfig::default();
        cfg.portfolio.initial_capital = 0.0;
        assert!(cfg.validate().is_err());
    }
}
