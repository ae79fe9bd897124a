/*!
Wallet scoring: a pure function over historical trades plus a write-through
cache (hot grade in the durable store, 1-hour TTL) fronting the full score.
*/

use crate::config::StoreConfig;
use crate::models::{Grade, HistoricalTrade, WalletScore, WalletScoreBreakdown};
use crate::store::Store;
use chrono::Utc;
use std::sync::Arc;

pub struct WalletScorer {
    store: Arc<Store>,
    ttl_seconds: u64,
}

impl WalletScorer {
    pub fn new(store: Arc<Store>, config: &StoreConfig) -> Self {
        Self {
            store,
            ttl_seconds: config.wallet_score_ttl_seconds,
        }
    }

    /// Redis-first, durable-store fallback; re-populates the cache on a
    /// store hit (write-through-on-read). Returns `Grade::Unknown` if
    /// neither source has a score for this address.
    pub async fn get_grade(&self, address: &str) -> Grade {
        if let Some(grade) = self.store.get_cached_wallet_grade(address).await {
            return grade;
        }
        if let Some(score) = self.store.load_wallet_score(address).await {
            let _ = self
                .store
                .cache_wallet_grade(address, score.grade, self.ttl_seconds)
                .await;
            return score.grade;
        }
        Grade::Unknown
    }

    pub async fn update_wallet_score(&self, address: &str, trades: &[HistoricalTrade]) -> WalletScore {
        let score = calculate_score(address, trades);
        let _ = self.store.save_wallet_score(&score).await;
        let _ = self
            .store
            .cache_wallet_grade(address, score.grade, self.ttl_seconds)
            .await;
        score
    }
}

/// Pure scoring function: `success_rate*0.4 + normalize(risk_adjusted_roi)*0.3 + timing_score*0.3`.
pub fn calculate_score(address: &str, trades: &[HistoricalTrade]) -> WalletScore {
    if trades.is_empty() {
        return WalletScore {
            address: address.to_string(),
            grade: Grade::D,
            components: WalletScoreBreakdown {
                success_rate: 0.0,
                roi_adjusted: 0.0,
                timing_score: 0.0,
            },
            total_markets: 0,
            total_volume: 0.0,
            avg_entry_timing: None,
            last_updated: Utc::now(),
        };
    }

    let wins = trades.iter().filter(|t| t.outcome.as_deref() == Some("WIN")).count();
    let losses = trades.iter().filter(|t| t.outcome.as_deref() == Some("LOSS")).count();
    let total_markets = wins + losses;
    let success_rate = if total_markets > 0 {
        wins as f64 / total_markets as f64
    } else {
        0.0
    };

    let total_profit: f64 = trades.iter().map(|t| t.profit).sum();
    let total_invested: f64 = trades.iter().map(|t| t.bet_size.abs()).sum();
    let avg_bet_size = if trades.is_empty() { 1.0 } else { total_invested / trades.len() as f64 };
    let avg_bet_size = if avg_bet_size == 0.0 { 1.0 } else { avg_bet_size };

    let roi = if total_invested > 0.0 { total_profit / total_invested } else { 0.0 };
    let risk_adjusted_roi = (roi / (avg_bet_size / 1000.0)).clamp(-2.0, 5.0);
    let roi_normalized = (risk_adjusted_roi + 1.0) / 6.0;

    let timing_entries: Vec<(f64, f64)> = trades
        .iter()
        .filter_map(|t| match (t.time_to_move, t.market_duration) {
            (Some(move_t), Some(duration)) => Some((move_t, duration)),
            _ => None,
        })
        .collect();

    let (timing_score, avg_entry_timing) = if timing_entries.is_empty() {
        (0.5, None)
    } else {
        let avg_move: f64 = timing_entries.iter().map(|(m, _)| m).sum::<f64>() / timing_entries.len() as f64;
        let avg_duration: f64 = timing_entries.iter().map(|(_, d)| d).sum::<f64>() / timing_entries.len() as f64;
        let score = if avg_duration > 0.0 {
            (1.0 - (avg_move / avg_duration)).clamp(0.0, 1.0)
        } else {
            0.5
        };
        (score, Some(avg_move))
    };

    let final_score = success_rate * 0.4 + roi_normalized * 0.3 + timing_score * 0.3;
    let grade = assign_grade(final_score);

    WalletScore {
        address: address.to_string(),
        grade,
        components: WalletScoreBreakdown {
            success_rate,
            roi_adjusted: risk_adjusted_roi,
            timing_score,
        },
        total_markets: total_markets as u32,
        total_volume: total_invested,
        avg_entry_timing,
        last_updated: Utc::now(),
    }
}

fn assign_grade(score: f64) -> Grade {
    if score >= 0.80 {
        Grade::A
    } else if score >= 0.60 {
        Grade::B
    } else if score >= 0.40 {
        Grade::C
    } else {
        Grade::D
    }
}
