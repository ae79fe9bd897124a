/*!
Durable persistence: pooled Redis/DragonflyDB-compatible client backing
signal recency lists, wallet score cache, and the system's append-only
record types (logs, paper trades, favorites, activity snapshots).
*/

use crate::config::StoreConfig;
use crate::models::{
    ActivitySnapshot, Favorite, Grade, PaperTrade, Signal, SystemLogEntry, WalletScore,
};
use crate::models::{TradingError, TradingResult};
use deadpool_redis::{
    redis::{AsyncCommands, RedisError},
    Config, Pool, Runtime,
};
use tracing::warn;

pub struct Store {
    pool: Pool,
}

impl From<RedisError> for TradingError {
    fn from(e: RedisError) -> Self {
        TradingError::DataError(e.to_string())
    }
}

impl Store {
    pub async fn connect(config: &StoreConfig) -> TradingResult<Self> {
        let cfg = Config::from_url(&config.connection_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| TradingError::ConfigError(e.to_string()))?;

        // Fail fast if the store is unreachable; this is a fatal startup error.
        let mut conn = pool
            .get()
            .await
            .map_err(|e| TradingError::ConfigError(format!("durable store unreachable: {e}")))?;
        let _: String = conn
            .set("__startup_ping__", "ok")
            .await
            .map_err(|e| TradingError::ConfigError(e.to_string()))?;

        Ok(Self { pool })
    }

    async fn conn(&self) -> TradingResult<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| TradingError::DataError(format!("pool exhausted: {e}")))
    }

    pub async fn push_recent_signal(&self, signal: &Signal, cap: isize) -> TradingResult<()> {
        let mut conn = self.conn().await?;
        let key = format!("signals:{}", signal.market_id);
        let value = serde_json::to_string(signal)?;
        let _: i64 = conn.lpush(&key, value).await?;
        let _: () = conn.ltrim(&key, 0, cap).await?;
        Ok(())
    }

    pub async fn recent_signals(&self, market_id: &str, limit: isize) -> Vec<Signal> {
        let Ok(mut conn) = self.conn().await else {
            return Vec::new();
        };
        let key = format!("signals:{market_id}");
        let raw: Vec<String> = conn.lrange(&key, 0, limit - 1).await.unwrap_or_default();
        raw.into_iter()
            .filter_map(|s| match serde_json::from_str(&s) {
                Ok(signal) => Some(signal),
                Err(e) => {
                    warn!(error = %e, "dropping malformed signal record");
                    None
                }
            })
            .collect()
    }

    pub async fn persist_signal(&self, signal: &Signal) -> TradingResult<()> {
        let mut conn = self.conn().await?;
        let key = format!("signal_log:{}", signal.market_id);
        let value = serde_json::to_string(signal)?;
        let _: i64 = conn.lpush(&key, value).await?;
        Ok(())
    }

    pub async fn cache_wallet_grade(
        &self,
        address: &str,
        grade: Grade,
        ttl_seconds: u64,
    ) -> TradingResult<()> {
        let mut conn = self.conn().await?;
        let key = format!("wallet_score:{address}");
        let _: () = conn.set_ex(&key, grade.as_str(), ttl_seconds).await?;
        Ok(())
    }

    pub async fn get_cached_wallet_grade(&self, address: &str) -> Option<Grade> {
        let mut conn = self.conn().await.ok()?;
        let key = format!("wallet_score:{address}");
        let raw: Option<String> = conn.get(&key).await.ok()?;
        raw.map(|s| Grade::from_str(&s))
    }

    pub async fn save_wallet_score(&self, score: &WalletScore) -> TradingResult<()> {
        let mut conn = self.conn().await?;
        let key = format!("wallet:{}", score.address);
        let value = serde_json::to_string(score)?;
        let _: () = conn.set(&key, value).await?;
        Ok(())
    }

    pub async fn load_wallet_score(&self, address: &str) -> Option<WalletScore> {
        let mut conn = self.conn().await.ok()?;
        let key = format!("wallet:{address}");
        let raw: Option<String> = conn.get(&key).await.ok()?;
        raw.and_then(|s| serde_json::from_str(&s).ok())
    }

    pub async fn save_paper_trade(&self, trade: &PaperTrade) -> TradingResult<()> {
        let mut conn = self.conn().await?;
        let key = format!("paper_trades:{}", trade.market_id);
        let value = serde_json::to_string(trade)?;
        let _: i64 = conn.lpush(&key, value).await?;
        Ok(())
    }

    pub async fn save_favorite(&self, favorite: &Favorite) -> TradingResult<()> {
        let mut conn = self.conn().await?;
        let key = format!("favorite:{}", favorite.market_id);
        let value = serde_json::to_string(favorite)?;
        let _: () = conn.set(&key, value).await?;
        let _: i64 = conn.sadd("favorites", &favorite.market_id).await?;
        Ok(())
    }

    pub async fn list_favorites(&self) -> Vec<Favorite> {
        let Ok(mut conn) = self.conn().await else {
            return Vec::new();
        };
        let ids: Vec<String> = conn.smembers("favorites").await.unwrap_or_default();
        let mut favorites = Vec::new();
        for id in ids {
            let key = format!("favorite:{id}");
            if let Ok(Some(raw)) = conn.get::<_, Option<String>>(&key).await {
                if let Ok(f) = serde_json::from_str(&raw) {
                    favorites.push(f);
                }
            }
        }
        favorites
    }

    pub async fn get_global_keywords(&self) -> Vec<String> {
        let Ok(mut conn) = self.conn().await else {
            return Vec::new();
        };
        let raw: Option<String> = conn.get("setting:listener_keywords").await.unwrap_or(None);
        raw.map(|s| {
            s.split(',')
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        })
        .unwrap_or_default()
    }

    pub async fn log(&self, entry: &SystemLogEntry) -> TradingResult<()> {
        let mut conn = self.conn().await?;
        let value = serde_json::to_string(entry)?;
        let _: i64 = conn.lpush("system_log", value).await?;
        let _: () = conn.ltrim("system_log", 0, 999).await?;
        Ok(())
    }

    pub async fn save_activity_snapshot(&self, snapshot: &ActivitySnapshot) -> TradingResult<()> {
        let mut conn = self.conn().await?;
        let value = serde_json::to_string(snapshot)?;
        let _: i64 = conn.lpush("activity_snapshots", value).await?;
        let _: () = conn.ltrim("activity_snapshots", 0, 999).await?;
        Ok(())
    }
}
